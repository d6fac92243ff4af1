//! The memory manager: process admission, termination, and access / page
//! fault resolution over the structures in [`crate::memory`].
//!
//! One `MemoryManager` owns all shared state and is driven by a single
//! caller one operation at a time; the `&mut self` receivers make that
//! single-writer rule compiler-enforced. A multi-threaded host must wrap
//! the whole manager in one mutex, since the operations mutate
//! interdependent state that is not individually atomic.

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{CapacityPlan, SimParams, BYTES_PER_MB};
use crate::error::{ConfigError, SimError, SimResult};
use crate::memory::{
    FifoQueue, FrameId, FramePool, PageIndex, PageRecord, PageTable, ProcessId, SwapSpace,
};

/// A live process and the pages it owns.
#[derive(Debug, Clone)]
pub struct Process {
    pub id: ProcessId,
    /// Requested size in MB.
    pub size_mb: u64,
    /// Indices into the global page table, in page-number order.
    pub pages: Vec<PageIndex>,
}

/// Report returned by a successful admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub pid: ProcessId,
    pub size_mb: u64,
    pub pages: usize,
    pub resident_pages: usize,
    pub swapped_pages: usize,
}

impl fmt::Display for Admission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "process {} admitted: {} MB over {} pages ({} resident, {} swapped)",
            self.pid, self.size_mb, self.pages, self.resident_pages, self.swapped_pages
        )
    }
}

/// Report returned by a termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Termination {
    pub pid: ProcessId,
    pub frames_freed: usize,
    pub swap_freed: usize,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "process {} terminated: {} frames and {} swap slots released",
            self.pid, self.frames_freed, self.swap_freed
        )
    }
}

/// The victim page swapped out while resolving a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictedPage {
    pub pid: ProcessId,
    pub page_number: usize,
}

/// Outcome of an access request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Nothing to access: no live process, or an unknown target.
    Idle,
    /// The page was already resident; no state changed.
    Hit {
        pid: ProcessId,
        page_number: usize,
        frame: FrameId,
        address: u64,
    },
    /// Page fault, resolved. `evicted` is `None` when a free frame was
    /// available and `Some` when a FIFO victim had to be swapped out.
    Fault {
        pid: ProcessId,
        page_number: usize,
        frame: FrameId,
        address: u64,
        evicted: Option<EvictedPage>,
    },
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Idle => write!(f, "no live process to access"),
            Access::Hit { pid, page_number, frame, address } => write!(
                f,
                "address {address} (process {pid}, page {page_number}): hit in frame {frame}"
            ),
            Access::Fault { pid, page_number, frame, address, evicted } => {
                write!(
                    f,
                    "address {address} (process {pid}, page {page_number}): page fault"
                )?;
                match evicted {
                    Some(victim) => write!(
                        f,
                        ", swapped out page {} of process {}, swapped in to frame {frame}",
                        victim.page_number, victim.pid
                    ),
                    None => write!(f, ", swapped in to free frame {frame}"),
                }
            }
        }
    }
}

/// Snapshot of the occupancy counters, for banners and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStats {
    pub total_frames: usize,
    pub free_frames: usize,
    pub resident_pages: usize,
    pub swap_capacity: usize,
    pub swap_used: usize,
    pub live_processes: usize,
    /// Pages outstanding for live processes: resident plus swapped.
    pub live_pages: usize,
}

/// Demand-paged memory manager with FIFO replacement.
pub struct MemoryManager {
    plan: CapacityPlan,
    params: SimParams,
    table: PageTable,
    frames: FramePool,
    swap: SwapSpace,
    fifo: FifoQueue,
    processes: Vec<Process>,
    next_pid: ProcessId,
    rng: StdRng,
}

impl MemoryManager {
    /// Build a manager, drawing the capacity plan (and with it the
    /// virtual-memory multiplier) from the seeded random source.
    pub fn new(params: SimParams, seed: Option<u64>) -> Result<Self, ConfigError> {
        let mut rng = Self::rng_for(seed);
        let plan = CapacityPlan::draw(&params, &mut rng)?;
        Ok(Self::from_parts(params, plan, rng))
    }

    /// Build a manager over an explicit capacity plan, bypassing the
    /// random sizing draw.
    pub fn with_plan(
        params: SimParams,
        plan: CapacityPlan,
        seed: Option<u64>,
    ) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self::from_parts(params, plan, Self::rng_for(seed)))
    }

    fn rng_for(seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    fn from_parts(params: SimParams, plan: CapacityPlan, rng: StdRng) -> Self {
        MemoryManager {
            frames: FramePool::new(plan.total_frames),
            swap: SwapSpace::new(plan.swap_pages),
            table: PageTable::new(),
            fifo: FifoQueue::new(),
            processes: Vec::new(),
            next_pid: 1,
            plan,
            params,
            rng,
        }
    }

    pub fn plan(&self) -> &CapacityPlan {
        &self.plan
    }

    /// Live processes, in admission order.
    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    /// Every page record ever created, tombstones included.
    pub fn page_records(&self) -> &[PageRecord] {
        self.table.records()
    }

    pub fn stats(&self) -> MemoryStats {
        let free_frames = self.frames.free_count();
        let resident_pages = self.plan.total_frames - free_frames;
        MemoryStats {
            total_frames: self.plan.total_frames,
            free_frames,
            resident_pages,
            swap_capacity: self.swap.capacity(),
            swap_used: self.swap.used(),
            live_processes: self.processes.len(),
            live_pages: resident_pages + self.swap.used(),
        }
    }

    /// Admit a new process with a size drawn uniformly from the configured
    /// range.
    pub fn create_process(&mut self) -> SimResult<Admission> {
        let size_mb = self
            .rng
            .gen_range(self.params.min_proc_mb..=self.params.max_proc_mb);
        self.admit_process(size_mb)
    }

    /// Admit a new process of exactly `size_mb` megabytes.
    ///
    /// The whole admission is checked up front: either every page finds a
    /// frame or a swap slot, or nothing is committed and
    /// `CapacityExhausted` is returned. The check counts pages outstanding
    /// for live processes, so capacity released by terminated processes is
    /// admissible again.
    pub fn admit_process(&mut self, size_mb: u64) -> SimResult<Admission> {
        let pages_needed = self.plan.pages_for(size_mb * BYTES_PER_MB);

        // Free frames are consumed before swap slots, so this single
        // pre-flight check guarantees every page below finds a home.
        let available = self.frames.free_count() + self.swap.remaining();
        if pages_needed > available {
            return Err(SimError::CapacityExhausted);
        }

        let pid = self.next_pid;
        self.next_pid += 1;

        let mut pages = Vec::with_capacity(pages_needed);
        let mut resident_pages = 0;
        for page_number in 0..pages_needed {
            let mut record = PageRecord::new(pid, page_number);
            if let Some(frame) = self.frames.allocate() {
                record.frame = Some(frame);
                let index = self.table.insert(record);
                self.fifo.push(index);
                pages.push(index);
                resident_pages += 1;
            } else {
                let reserved = self.swap.reserve();
                debug_assert!(reserved, "pre-flight check left no swap slot");
                pages.push(self.table.insert(record));
            }
        }

        self.processes.push(Process { id: pid, size_mb, pages });

        Ok(Admission {
            pid,
            size_mb,
            pages: pages_needed,
            resident_pages,
            swapped_pages: pages_needed - resident_pages,
        })
    }

    /// Terminate a uniformly chosen live process. `None` when no process
    /// is live.
    pub fn kill_random_process(&mut self) -> Option<Termination> {
        if self.processes.is_empty() {
            return None;
        }
        let chosen = self.rng.gen_range(0..self.processes.len());
        let pid = self.processes[chosen].id;
        self.kill_process(pid)
    }

    /// Terminate the process identified by `pid`, releasing every frame it
    /// held and every swap slot it occupied. Its page records stay in the
    /// table as tombstones; their eviction queue entries go stale and are
    /// discarded lazily when fault resolution scans past them.
    pub fn kill_process(&mut self, pid: ProcessId) -> Option<Termination> {
        let position = self.processes.iter().position(|p| p.id == pid)?;
        let process = self.processes.remove(position);

        let mut frames_freed = 0;
        let mut swap_freed = 0;
        for &index in &process.pages {
            let record = self.table.get_mut(index);
            record.owner = None;
            // Taking the frame here keeps the record's stale queue entry
            // inert: the frame goes back to the pool now, and the resolver
            // never reads a frame id out of a tombstone.
            if let Some(frame) = record.frame.take() {
                self.frames.release(frame);
                frames_freed += 1;
            } else {
                self.swap.release();
                swap_freed += 1;
            }
        }

        Some(Termination { pid: process.id, frames_freed, swap_freed })
    }

    /// Access one uniformly chosen page of one uniformly chosen live
    /// process. A no-op (`Access::Idle`) when no process is live.
    pub fn access_random(&mut self) -> SimResult<Access> {
        if self.processes.is_empty() {
            return Ok(Access::Idle);
        }
        let chosen = self.rng.gen_range(0..self.processes.len());
        let pid = self.processes[chosen].id;
        let page_count = self.processes[chosen].pages.len();
        if page_count == 0 {
            return Ok(Access::Idle);
        }
        let page_number = self.rng.gen_range(0..page_count);
        self.access_page(pid, page_number)
    }

    /// Access page `page_number` of process `pid`. Unknown targets are a
    /// no-op success; a non-resident page triggers fault resolution.
    pub fn access_page(&mut self, pid: ProcessId, page_number: usize) -> SimResult<Access> {
        let Some(process) = self.processes.iter().find(|p| p.id == pid) else {
            return Ok(Access::Idle);
        };
        let Some(&index) = process.pages.get(page_number) else {
            return Ok(Access::Idle);
        };
        let address = page_number as u64 * self.plan.page_bytes;

        if let Some(frame) = self.table.get(index).frame {
            return Ok(Access::Hit { pid, page_number, frame, address });
        }

        let (frame, evicted) = self.find_frame_for_fault()?;
        self.table.get_mut(index).frame = Some(frame);
        self.fifo.push(index);
        // The faulting page held a swap slot until this moment.
        self.swap.release();

        Ok(Access::Fault { pid, page_number, frame, address, evicted })
    }

    /// Obtain a frame for a faulting page: a free frame if the pool has
    /// one, otherwise the frame of the earliest-admitted page that is
    /// still resident and still owned by a live process.
    ///
    /// Stale queue entries (pages terminated or evicted since they were
    /// queued) are discarded as they are encountered. Their frames went
    /// back to the pool when they went stale, so nothing is reclaimed from
    /// them here; reclaiming would hand the same frame out twice.
    fn find_frame_for_fault(&mut self) -> SimResult<(FrameId, Option<EvictedPage>)> {
        if let Some(frame) = self.frames.allocate() {
            return Ok((frame, None));
        }

        while let Some(victim_index) = self.fifo.pop() {
            let victim = self.table.get(victim_index);
            let page_number = victim.page_number;
            let (Some(owner), Some(frame)) = (victim.owner, victim.frame) else {
                continue;
            };

            // Swapping the victim out needs a slot of its own.
            if !self.swap.reserve() {
                return Err(SimError::SwapExhausted);
            }
            self.table.get_mut(victim_index).frame = None;
            return Ok((frame, Some(EvictedPage { pid: owner, page_number })));
        }

        Err(SimError::UnrecoverableFault)
    }
}
