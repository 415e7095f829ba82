//! Cooperative routine scheduler.
//!
//! Multiplexes many routines onto the thread that calls [`Scheduler::run`],
//! with no pre-emption: a routine runs until it hands control back, and a
//! routine that never does starves the rest. Routines are resumable state
//! machines — an `FnMut(&mut Scope) -> Step` whose captured state is its
//! whole execution state — so suspension is an ordinary function return and
//! resumption is an ordinary call. There is no stack capture, no saved
//! register set, and nothing to walk on restore.
//!
//! # Scheduling model
//!
//! ```text
//!            ┌────────────────── dispatch loop ───────────────────┐
//!            │  (the "idle" routine: owns control between steps)  │
//!            └──────┬─────────────────────────────────────▲───────┘
//!                   │ call                         return │ Step
//!            ┌──────▼─────────────────────────────────────┴──────┐
//!            │   current routine: runs on the host stack until   │
//!            │   it returns Yield / Sched(h) / Block / Done      │
//!            └───────────────────────────────────────────────────┘
//! ```
//!
//! Routines live in two intrusive lists threaded through a slab of slots:
//! *alive* (runnable) and *blocked*. A routine is in exactly one list at a
//! time; insertion is at the head, removal re-ties the neighbours and fixes
//! the head when needed.
//!
//! The returned [`Step`] picks the next routine:
//!
//! - [`Step::Yield`] — run the head of the alive list (skipping the
//!   yielding routine itself); when no other routine is alive, the yielder
//!   simply continues.
//! - [`Step::Sched`] — run the named routine; when it is the current one,
//!   blocked, or gone, the current routine continues instead.
//! - [`Step::Block`] — move the current routine to the blocked list and
//!   fall back to the dispatch loop. Because the move happens before the
//!   next pick, a routine that just blocked itself can never be chosen
//!   again until someone unblocks it.
//! - [`Step::Done`] — the routine is finished; its slot is released.
//!
//! Blocking and unblocking *other* routines are not suspension points:
//! [`Scope::block`] and [`Scope::unblock`] take effect immediately while
//! the current routine keeps running, and unblocking never schedules the
//! unblocked routine by itself.
//!
//! # Single-threaded by construction
//!
//! `Scheduler` is deliberately `!Send` and `!Sync`; entering it from two
//! threads is a compile error, not a runtime hazard.
//!
//! # Example
//!
//! ```
//! use bytecache::coroutine::{Scheduler, Step};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let mut scheduler = Scheduler::new();
//! let ticks = Rc::new(Cell::new(0u32));
//!
//! let counted = Rc::clone(&ticks);
//! scheduler.start(move |_scope| {
//!     if counted.get() < 3 {
//!         counted.set(counted.get() + 1);
//!         Step::Yield
//!     } else {
//!         Step::Done
//!     }
//! });
//!
//! assert_eq!(ticks.get(), 3);
//! ```

use std::fmt;
use std::marker::PhantomData;

use tracing::trace;

/// What a routine does at its suspension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Hand control to the next alive routine; keep running when there is
    /// no other.
    Yield,
    /// Hand control to the named routine. Falls back to continuing the
    /// current routine when the target is the current routine, blocked, or
    /// no longer exists.
    Sched(RoutineHandle),
    /// Block the current routine and return control to the dispatch loop.
    /// Someone must [`unblock`](Scope::unblock) it for it to run again.
    Block,
    /// The routine is finished; its slot is released.
    Done,
}

/// Opaque identifier of a spawned routine.
///
/// Handles stay valid until the routine returns [`Step::Done`]; operations
/// on a finished routine's handle are no-ops (slots are generation-tagged,
/// so a recycled slot never honours an old handle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoutineHandle {
    slot: usize,
    generation: u64,
}

/// The body of a routine.
type RoutineFn = Box<dyn FnMut(&mut Scope<'_>) -> Step>;

/// One slab slot: a routine plus its intrusive list links.
struct Slot {
    routine: Option<RoutineFn>,
    generation: u64,
    occupied: bool,
    blocked: bool,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Cooperative single-threaded scheduler of [`Step`]-returning routines.
pub struct Scheduler {
    slots: Vec<Slot>,
    free: Vec<usize>,
    /// Head of the alive (runnable) list.
    alive: Option<usize>,
    /// Head of the blocked list.
    blocked: Option<usize>,
    /// Slot of the routine currently being stepped, if any.
    current: Option<usize>,
    /// Raw-pointer marker: keeps the scheduler !Send + !Sync.
    _single_thread: PhantomData<*const ()>,
}

impl Scheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Scheduler {
            slots: Vec::new(),
            free: Vec::new(),
            alive: None,
            blocked: None,
            current: None,
            _single_thread: PhantomData,
        }
    }

    /// Adds a routine to the alive list without running it.
    pub fn spawn<F>(&mut self, routine: F) -> RoutineHandle
    where
        F: FnMut(&mut Scope<'_>) -> Step + 'static,
    {
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                self.slots.push(Slot {
                    routine: None,
                    generation: 0,
                    occupied: false,
                    blocked: false,
                    prev: None,
                    next: None,
                });
                self.slots.len() - 1
            }
        };

        let s = &mut self.slots[slot];
        s.routine = Some(Box::new(routine));
        s.occupied = true;
        s.blocked = false;
        let handle = RoutineHandle {
            slot,
            generation: s.generation,
        };
        self.attach(slot, false);
        trace!(slot, "routine spawned");
        handle
    }

    /// Spawns `entry` and drives the scheduler until no routine is alive.
    ///
    /// Equivalent to [`spawn`](Self::spawn) followed by [`run`](Self::run).
    pub fn start<F>(&mut self, entry: F) -> RoutineHandle
    where
        F: FnMut(&mut Scope<'_>) -> Step + 'static,
    {
        let handle = self.spawn(entry);
        self.run();
        handle
    }

    /// Runs routines until the alive list is empty.
    ///
    /// Returns the number of routines left on the blocked list; a non-zero
    /// result means the schedule deadlocked waiting for an unblock that
    /// never came.
    pub fn run(&mut self) -> usize {
        self.current = self.alive;
        while let Some(idx) = self.current {
            let step = self.step(idx);

            self.current = match step {
                Step::Done => {
                    self.finish(idx);
                    self.alive
                }
                Step::Block => {
                    self.block_slot(idx);
                    self.alive
                }
                // The routine may have blocked itself through its scope
                // mid-step; that overrides whatever it returned.
                _ if self.slots[idx].blocked => self.alive,
                Step::Yield => self.yield_pick(idx),
                Step::Sched(handle) => self.sched_pick(idx, handle),
            };
        }
        self.blocked_count()
    }

    /// Moves the named routine to the blocked list and marks it blocked.
    ///
    /// No-op when the handle is stale or the routine is already blocked.
    /// Blocking does not suspend anything by itself; a routine blocking
    /// *itself* should return [`Step::Block`] (or rely on the dispatch loop
    /// noticing the flag at the end of its step).
    pub fn block(&mut self, handle: RoutineHandle) {
        if let Some(idx) = self.live_slot(handle) {
            self.block_slot(idx);
        }
    }

    /// Moves the named routine back to the alive list and clears its flag.
    ///
    /// Does not schedule the routine; it simply becomes eligible again.
    /// No-op for stale handles and routines that are not blocked.
    pub fn unblock(&mut self, handle: RoutineHandle) {
        if let Some(idx) = self.live_slot(handle) {
            if self.slots[idx].blocked {
                self.detach(idx);
                self.attach(idx, false);
                self.slots[idx].blocked = false;
                trace!(slot = idx, "routine unblocked");
            }
        }
    }

    /// Returns `true` while the routine exists (has not returned `Done`).
    pub fn is_live(&self, handle: RoutineHandle) -> bool {
        self.live_slot(handle).is_some()
    }

    /// Returns `true` when the routine exists and sits on the blocked list.
    pub fn is_blocked(&self, handle: RoutineHandle) -> bool {
        self.live_slot(handle)
            .map(|idx| self.slots[idx].blocked)
            .unwrap_or(false)
    }

    /// Number of runnable routines.
    pub fn alive_count(&self) -> usize {
        self.count_list(self.alive)
    }

    /// Number of blocked routines.
    pub fn blocked_count(&self) -> usize {
        self.count_list(self.blocked)
    }

    /// Runs one step of the routine in `idx`.
    fn step(&mut self, idx: usize) -> Step {
        let mut routine = self.slots[idx]
            .routine
            .take()
            .expect("routine stepped while already running");
        let mut scope = Scope {
            scheduler: self,
            current: idx,
        };
        let step = (routine)(&mut scope);
        // Scope operations can move the slot between lists but never free
        // it, so the routine always has its slot to return to.
        self.slots[idx].routine = Some(routine);
        step
    }

    /// Picks the successor of a yielding routine: the alive head, or the
    /// yielder's neighbour when the yielder is the head. Falls back to the
    /// yielder itself when nothing else is runnable.
    fn yield_pick(&self, idx: usize) -> Option<usize> {
        let mut candidate = self.alive;
        if candidate == Some(idx) {
            candidate = self.slots[idx].next;
        }
        candidate.or(Some(idx))
    }

    /// Picks the target of an explicit switch, falling back to the current
    /// routine when the target is the current routine, blocked, or gone.
    fn sched_pick(&self, idx: usize, handle: RoutineHandle) -> Option<usize> {
        match self.live_slot(handle) {
            Some(target) if target != idx && !self.slots[target].blocked => Some(target),
            _ => Some(idx),
        }
    }

    /// Releases a finished routine's slot.
    fn finish(&mut self, idx: usize) {
        self.detach(idx);
        let s = &mut self.slots[idx];
        s.routine = None;
        s.occupied = false;
        s.blocked = false;
        s.generation += 1;
        self.free.push(idx);
        trace!(slot = idx, "routine finished");
    }

    /// Moves a slot from the alive list to the blocked list.
    fn block_slot(&mut self, idx: usize) {
        if !self.slots[idx].blocked {
            self.detach(idx);
            self.attach(idx, true);
            self.slots[idx].blocked = true;
            trace!(slot = idx, "routine blocked");
        }
    }

    /// Resolves a handle to its slot when the routine is still live.
    fn live_slot(&self, handle: RoutineHandle) -> Option<usize> {
        let slot = self.slots.get(handle.slot)?;
        (slot.occupied && slot.generation == handle.generation).then_some(handle.slot)
    }

    /// Unlinks a slot from whichever list holds it.
    fn detach(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);
        if let Some(p) = prev {
            self.slots[p].next = next;
        }
        if let Some(n) = next {
            self.slots[n].prev = prev;
        }
        if self.alive == Some(idx) {
            self.alive = next;
        } else if self.blocked == Some(idx) {
            self.blocked = next;
        }
        self.slots[idx].prev = None;
        self.slots[idx].next = None;
    }

    /// Links a slot in at the head of the alive or blocked list.
    fn attach(&mut self, idx: usize, to_blocked: bool) {
        let head = if to_blocked { self.blocked } else { self.alive };
        self.slots[idx].prev = None;
        self.slots[idx].next = head;
        if let Some(h) = head {
            self.slots[h].prev = Some(idx);
        }
        if to_blocked {
            self.blocked = Some(idx);
        } else {
            self.alive = Some(idx);
        }
    }

    fn count_list(&self, head: Option<usize>) -> usize {
        let mut count = 0;
        let mut cursor = head;
        while let Some(idx) = cursor {
            count += 1;
            cursor = self.slots[idx].next;
        }
        count
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("alive", &self.alive_count())
            .field("blocked", &self.blocked_count())
            .field("current", &self.current)
            .finish()
    }
}

/// Capabilities available to a routine while it runs.
///
/// Everything here is immediate — none of these suspend the caller. The
/// routine suspends only by returning its [`Step`].
pub struct Scope<'a> {
    scheduler: &'a mut Scheduler,
    current: usize,
}

impl Scope<'_> {
    /// The running routine's own handle.
    pub fn handle(&self) -> RoutineHandle {
        RoutineHandle {
            slot: self.current,
            generation: self.scheduler.slots[self.current].generation,
        }
    }

    /// Spawns a new routine onto the alive list.
    pub fn spawn<F>(&mut self, routine: F) -> RoutineHandle
    where
        F: FnMut(&mut Scope<'_>) -> Step + 'static,
    {
        self.scheduler.spawn(routine)
    }

    /// Blocks a routine. `None` blocks the caller itself: the flag is set
    /// immediately and the suspension happens when the current step
    /// returns, so the caller cannot be picked again in between.
    pub fn block(&mut self, target: Option<RoutineHandle>) {
        match target {
            Some(handle) if handle != self.handle() => self.scheduler.block(handle),
            _ => {
                let own = self.handle();
                self.scheduler.block(own);
            }
        }
    }

    /// Makes a blocked routine runnable again without scheduling it.
    pub fn unblock(&mut self, target: RoutineHandle) {
        self.scheduler.unblock(target);
    }

    /// Whether the named routine exists and is blocked.
    pub fn is_blocked(&self, target: RoutineHandle) -> bool {
        self.scheduler.is_blocked(target)
    }
}
