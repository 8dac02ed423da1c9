//! Best-effort real-time setup for the acquisition thread (Linux only).
//!
//! Bit-bang pulse widths live under a 60 microsecond ceiling, so scheduler
//! preemption mid-pulse shows up as discarded frames. Locking memory,
//! switching to SCHED_FIFO, and pinning to one CPU each reduce that risk;
//! every step degrades to a warning when the process lacks the privilege.

use std::sync::OnceLock;

use tracing::{info, warn};

/// Apply mlockall, SCHED_FIFO at `prio` (clamped to the system range, max
/// when `None`), and affinity to `cpu` if given. Idempotent; only the first
/// call does anything.
pub fn setup_rt_once(prio: Option<i32>, cpu: Option<usize>) {
    static RT_ONCE: OnceLock<()> = OnceLock::new();
    RT_ONCE.get_or_init(|| {
        match lock_memory() {
            Ok(()) => info!("rt: memory locked (current|future)"),
            Err(err) => warn!(%err, "rt: mlockall failed"),
        }
        match apply_fifo(prio) {
            Ok(applied) => info!(prio = applied, "rt: SCHED_FIFO applied"),
            Err(err) => warn!(%err, "rt: SCHED_FIFO not applied"),
        }
        if let Some(cpu) = cpu {
            match pin_to_cpu(cpu) {
                Ok(()) => info!(cpu, "rt: pinned"),
                Err(err) => warn!(%err, cpu, "rt: affinity not applied"),
            }
        }
    });
}

fn lock_memory() -> std::io::Result<()> {
    let rc = unsafe { libc::mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

fn apply_fifo(prio: Option<i32>) -> std::io::Result<i32> {
    let (min, max) = unsafe {
        let min = libc::sched_get_priority_min(libc::SCHED_FIFO);
        let max = libc::sched_get_priority_max(libc::SCHED_FIFO);
        if min < 0 || max < 0 { (1, 99) } else { (min, max) }
    };
    let wanted = prio.unwrap_or(max).clamp(min, max);
    let param = libc::sched_param {
        sched_priority: wanted,
    };
    let rc = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(wanted)
}

fn pin_to_cpu(cpu: usize) -> std::io::Result<()> {
    let max_bits = std::mem::size_of::<libc::cpu_set_t>() * 8;
    if cpu >= max_bits {
        return Err(std::io::Error::other(format!(
            "cpu {cpu} exceeds cpu_set_t capacity {max_bits}"
        )));
    }
    let mut set: libc::cpu_set_t = unsafe { std::mem::zeroed() };
    unsafe {
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(cpu, &mut set);
    }
    let rc = unsafe { libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}
