//! Real-time scheduling for the step loop (Linux SCHED_FIFO, mlockall, CPU affinity).

use crate::cli::RtLock;

#[cfg(target_os = "linux")]
fn os_result(rc: libc::c_int) -> std::io::Result<()> {
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(target_os = "linux")]
const MEMLOCK_HINT: &str = "needs CAP_IPC_LOCK or a larger 'ulimit -l'";

#[cfg(target_os = "linux")]
fn lock_memory(lock: RtLock) -> eyre::Result<()> {
    use libc::{MCL_CURRENT, MCL_FUTURE, mlockall};
    let flags = match lock {
        RtLock::None => return Ok(()),
        RtLock::Current => MCL_CURRENT,
        RtLock::All => MCL_CURRENT | MCL_FUTURE,
    };
    // SAFETY: mlockall takes no pointers.
    let first = os_result(unsafe { mlockall(flags) });
    match first {
        Ok(()) => Ok(()),
        Err(e)
            if lock == RtLock::All
                && matches!(e.raw_os_error(), Some(libc::EPERM | libc::ENOMEM)) =>
        {
            // SAFETY: as above.
            os_result(unsafe { mlockall(MCL_CURRENT) }).map_err(|e2| {
                eyre::eyre!(
                    "mlockall(current|future) failed: {e}; fallback mlockall(current) failed: {e2}; {MEMLOCK_HINT}"
                )
            })
        }
        Err(e) => Err(eyre::eyre!("mlockall failed: {e}; {MEMLOCK_HINT}")),
    }
}

#[cfg(target_os = "linux")]
fn fifo_priority(prio: Option<i32>) -> eyre::Result<i32> {
    use libc::{SCHED_FIFO, sched_get_priority_max, sched_get_priority_min, sched_param};
    // SAFETY: plain queries on a constant policy.
    let (min, max) = unsafe {
        (
            sched_get_priority_min(SCHED_FIFO),
            sched_get_priority_max(SCHED_FIFO),
        )
    };
    let (min, max) = if min < 0 || max < 0 { (1, 99) } else { (min, max) };
    let p = prio.unwrap_or(max).clamp(min, max);
    let param = sched_param { sched_priority: p };
    // SAFETY: `param` outlives the call; pid 0 is the calling process.
    os_result(unsafe { libc::sched_setscheduler(0, SCHED_FIFO, &param) }).map_err(|e| {
        eyre::eyre!("sched_setscheduler(SCHED_FIFO, {p}) failed: {e}; needs CAP_SYS_NICE or root")
    })?;
    Ok(p)
}

#[cfg(target_os = "linux")]
fn pin_cpu(cpu: usize) -> eyre::Result<()> {
    let capacity = std::mem::size_of::<libc::cpu_set_t>() * 8;
    if cpu >= capacity {
        eyre::bail!("CPU {cpu} exceeds cpu_set_t capacity {capacity}");
    }
    // SAFETY: an all-zero cpu_set_t is the empty set; `cpu` is within its capacity.
    let mut set: libc::cpu_set_t = unsafe { std::mem::zeroed() };
    unsafe { libc::CPU_SET(cpu, &mut set) };
    // SAFETY: `set` is a valid cpu_set_t of the size passed; pid 0 is the calling process.
    os_result(unsafe {
        libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set)
    })
    .map_err(|e| eyre::eyre!("sched_setaffinity(cpu {cpu}) failed: {e}"))
}

/// Apply real-time settings once per process. Failures are logged and the run continues.
pub fn setup_rt_once(prio: Option<i32>, lock: RtLock, cpu: Option<usize>) {
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();
    RT_ONCE.get_or_init(|| {
        #[cfg(target_os = "linux")]
        {
            match lock_memory(lock) {
                Ok(()) => tracing::info!(?lock, "memory lock applied"),
                Err(e) => tracing::warn!(error = %e, "memory lock not applied"),
            }
            match fifo_priority(prio) {
                Ok(p) => tracing::info!(priority = p, "SCHED_FIFO applied"),
                Err(e) => tracing::warn!(error = %e, "real-time priority not applied"),
            }
            if let Some(cpu) = cpu {
                match pin_cpu(cpu) {
                    Ok(()) => tracing::info!(cpu, "pinned to CPU"),
                    Err(e) => tracing::warn!(error = %e, "affinity not applied"),
                }
            }
        }
        #[cfg(not(target_os = "linux"))]
        {
            tracing::warn!(?prio, ?lock, ?cpu, "real-time mode is only supported on Linux");
        }
    });
}
