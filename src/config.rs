//! Sizing parameters and the randomized capacity plan.
//!
//! The planner turns the raw command-line sizes (RAM in MB, page in KB,
//! process range in MB) into frame and swap-page counts. Total virtual
//! memory is drawn once per run as a random multiple of physical RAM, and
//! swap is whatever the virtual total adds on top of RAM.

use rand::Rng;

use crate::error::ConfigError;

/// Total virtual memory is `ram * m` with `m` uniform in this range.
pub const VIRTUAL_MULTIPLIER_MIN: f64 = 1.5;
pub const VIRTUAL_MULTIPLIER_MAX: f64 = 4.5;

pub const BYTES_PER_KB: u64 = 1024;
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Raw sizing inputs as given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimParams {
    /// Physical RAM size in MB.
    pub ram_mb: u64,
    /// Page size in KB.
    pub page_kb: u64,
    /// Smallest admissible process size in MB.
    pub min_proc_mb: u64,
    /// Largest admissible process size in MB.
    pub max_proc_mb: u64,
}

impl SimParams {
    /// Reject sizes the planner cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ram_mb == 0 {
            return Err(ConfigError::InvalidRamSize(self.ram_mb));
        }
        if self.page_kb == 0 {
            return Err(ConfigError::InvalidPageSize(self.page_kb));
        }
        if self.min_proc_mb == 0 || self.min_proc_mb > self.max_proc_mb {
            return Err(ConfigError::InvalidSizeRange {
                min: self.min_proc_mb,
                max: self.max_proc_mb,
            });
        }
        if self.page_bytes() > self.ram_bytes() {
            return Err(ConfigError::PageLargerThanRam {
                ram_mb: self.ram_mb,
                page_kb: self.page_kb,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn ram_bytes(&self) -> u64 {
        self.ram_mb * BYTES_PER_MB
    }

    #[inline]
    pub fn page_bytes(&self) -> u64 {
        self.page_kb * BYTES_PER_KB
    }
}

/// Frame and swap capacities derived from `SimParams` plus the randomized
/// virtual-memory multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityPlan {
    /// Page (and frame, and swap slot) size in bytes.
    pub page_bytes: u64,
    /// Number of physical RAM frames.
    pub total_frames: usize,
    /// Number of swap slots, in page units.
    pub swap_pages: usize,
    /// Total virtual memory the plan was drawn for.
    pub virtual_bytes: u64,
}

impl CapacityPlan {
    /// Draw a plan for `params`, picking the virtual-memory multiplier
    /// uniformly from `[1.5, 4.5)`.
    pub fn draw(params: &SimParams, rng: &mut impl Rng) -> Result<Self, ConfigError> {
        params.validate()?;

        let ram_bytes = params.ram_bytes();
        let page_bytes = params.page_bytes();

        let multiplier = rng.gen_range(VIRTUAL_MULTIPLIER_MIN..VIRTUAL_MULTIPLIER_MAX);
        let virtual_bytes = (ram_bytes as f64 * multiplier) as u64;
        let swap_bytes = virtual_bytes.saturating_sub(ram_bytes);

        Ok(CapacityPlan {
            page_bytes,
            total_frames: (ram_bytes / page_bytes) as usize,
            swap_pages: (swap_bytes / page_bytes) as usize,
            virtual_bytes,
        })
    }

    /// A plan with explicit frame and swap-slot counts, bypassing the
    /// random draw. Used by deterministic scenarios and tests.
    pub fn fixed(page_bytes: u64, total_frames: usize, swap_pages: usize) -> Self {
        CapacityPlan {
            page_bytes,
            total_frames,
            swap_pages,
            virtual_bytes: page_bytes * (total_frames + swap_pages) as u64,
        }
    }

    /// Number of pages needed to back `size_bytes`, rounding up.
    #[inline]
    pub fn pages_for(&self, size_bytes: u64) -> usize {
        size_bytes.div_ceil(self.page_bytes) as usize
    }

    /// Total page slots in the system: RAM frames plus swap slots.
    #[inline]
    pub fn total_page_slots(&self) -> usize {
        self.total_frames + self.swap_pages
    }

    #[inline]
    pub fn ram_bytes(&self) -> u64 {
        self.page_bytes * self.total_frames as u64
    }

    #[inline]
    pub fn swap_bytes(&self) -> u64 {
        self.page_bytes * self.swap_pages as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn params(ram_mb: u64, page_kb: u64) -> SimParams {
        SimParams { ram_mb, page_kb, min_proc_mb: 1, max_proc_mb: 4 }
    }

    #[test]
    fn test_frame_count_divides_ram_by_page_size() {
        let mut rng = StdRng::seed_from_u64(1);
        let plan = CapacityPlan::draw(&params(8, 1024), &mut rng).unwrap();
        assert_eq!(plan.total_frames, 8);
        assert_eq!(plan.page_bytes, BYTES_PER_MB);
    }

    #[test]
    fn test_virtual_total_stays_in_multiplier_range() {
        // Many draws, all bounded by the multiplier interval.
        let mut rng = StdRng::seed_from_u64(42);
        let p = params(64, 4);
        for _ in 0..100 {
            let plan = CapacityPlan::draw(&p, &mut rng).unwrap();
            let ram = p.ram_bytes() as f64;
            let virt = plan.virtual_bytes as f64;
            assert!(virt >= ram * VIRTUAL_MULTIPLIER_MIN - 1.0);
            assert!(virt < ram * VIRTUAL_MULTIPLIER_MAX);
            // Swap is the non-RAM remainder of the virtual total.
            assert_eq!(
                plan.swap_pages as u64,
                plan.virtual_bytes.saturating_sub(p.ram_bytes()) / plan.page_bytes
            );
        }
    }

    #[test]
    fn test_zero_ram_rejected() {
        assert_eq!(
            params(0, 4).validate(),
            Err(ConfigError::InvalidRamSize(0))
        );
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert_eq!(
            params(8, 0).validate(),
            Err(ConfigError::InvalidPageSize(0))
        );
    }

    #[test]
    fn test_inverted_process_range_rejected() {
        let p = SimParams { ram_mb: 8, page_kb: 4, min_proc_mb: 5, max_proc_mb: 2 };
        assert_eq!(
            p.validate(),
            Err(ConfigError::InvalidSizeRange { min: 5, max: 2 })
        );
    }

    #[test]
    fn test_zero_min_process_size_rejected() {
        let p = SimParams { ram_mb: 8, page_kb: 4, min_proc_mb: 0, max_proc_mb: 2 };
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_page_larger_than_ram_rejected() {
        // 2048 KB page against 1 MB of RAM would leave zero frames.
        let p = params(1, 2048);
        assert_eq!(
            p.validate(),
            Err(ConfigError::PageLargerThanRam { ram_mb: 1, page_kb: 2048 })
        );
    }

    #[test]
    fn test_pages_for_rounds_up() {
        let plan = CapacityPlan::fixed(BYTES_PER_MB, 4, 4);
        assert_eq!(plan.pages_for(BYTES_PER_MB), 1);
        assert_eq!(plan.pages_for(BYTES_PER_MB + 1), 2);
        assert_eq!(plan.pages_for(3 * BYTES_PER_MB - 1), 3);
    }

    #[test]
    fn test_fixed_plan_counts() {
        let plan = CapacityPlan::fixed(BYTES_PER_MB, 4, 12);
        assert_eq!(plan.total_frames, 4);
        assert_eq!(plan.swap_pages, 12);
        assert_eq!(plan.total_page_slots(), 16);
        assert_eq!(plan.ram_bytes(), 4 * BYTES_PER_MB);
        assert_eq!(plan.swap_bytes(), 12 * BYTES_PER_MB);
    }
}
