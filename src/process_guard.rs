//! Process lifecycle management for Terraform and az child processes
//!
//! An interrupted `terraform apply` that keeps running after the orchestrator
//! dies can hold the state lock, or finish applying changes nobody is watching.
//!
//! # Solution
//! - Spawn every tool in its own process group
//! - Track running child PIDs in a global registry while they run
//! - On SIGINT/SIGTERM/SIGHUP, send SIGTERM to every registered group, give
//!   Terraform time to release its lock and persist state, then SIGKILL

use std::collections::HashSet;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::{debug, error, info, warn};

/// Time Terraform gets to write state after SIGTERM
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(20);

static CHILD_REGISTRY: OnceLock<Arc<Mutex<ChildRegistry>>> = OnceLock::new();

/// Registry tracking all running tool processes
#[derive(Debug, Default)]
pub struct ChildRegistry {
    pids: HashSet<u32>,
    /// Set once shutdown started; later calls are no-ops
    cleanup_initiated: bool,
}

impl ChildRegistry {
    /// Get or create the global child registry
    pub fn global() -> Arc<Mutex<ChildRegistry>> {
        CHILD_REGISTRY
            .get_or_init(|| Arc::new(Mutex::new(ChildRegistry::default())))
            .clone()
    }

    pub fn register(&mut self, pid: u32) {
        self.pids.insert(pid);
        debug!("Registered child process PID {}", pid);
    }

    pub fn unregister(&mut self, pid: u32) {
        self.pids.remove(&pid);
        debug!("Unregistered child process PID {}", pid);
    }

    pub fn count(&self) -> usize {
        self.pids.len()
    }

    /// Stop every tracked tool: SIGTERM to each process group, wait up to
    /// `grace_period` for them to exit, then SIGKILL the rest.
    ///
    /// Returns how many groups had to be killed. Only the first call does anything.
    pub fn terminate_all(&mut self, grace_period: Duration) -> usize {
        if std::mem::replace(&mut self.cleanup_initiated, true) || self.pids.is_empty() {
            return 0;
        }

        let targets: Vec<u32> = self.pids.drain().collect();
        info!("Stopping {} running tool process(es)", targets.len());
        send_to_groups(&targets, Signal::SIGTERM);

        let survivors = wait_for_exit(&targets, grace_period);
        if survivors.is_empty() {
            info!("All tool processes exited");
        } else {
            warn!(
                "{} process group(s) still running after {:?}, sending SIGKILL",
                survivors.len(),
                grace_period
            );
            send_to_groups(&survivors, Signal::SIGKILL);
        }
        survivors.len()
    }
}

/// Signal each group leader's whole group, falling back to the leader alone
fn send_to_groups(leaders: &[u32], sig: Signal) {
    for &leader in leaders {
        // negative pid addresses the group, including providers Terraform forked
        let group = Pid::from_raw(-(leader as i32));
        if let Err(e) = signal::kill(group, sig) {
            debug!("{} to group {} failed ({}), signalling the leader", sig, leader, e);
            if let Err(e) = signal::kill(Pid::from_raw(leader as i32), sig) {
                error!("Cannot send {} to PID {}: {}", sig, leader, e);
            }
        }
    }
}

/// Poll until every leader is gone or `timeout` passes; returns the survivors
fn wait_for_exit(leaders: &[u32], timeout: Duration) -> Vec<u32> {
    let deadline = Instant::now() + timeout;
    loop {
        let alive: Vec<u32> = leaders.iter().copied().filter(|&pid| is_process_alive(pid)).collect();
        if alive.is_empty() || Instant::now() >= deadline {
            return alive;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
}

/// Alive and not a zombie
fn is_process_alive(pid: u32) -> bool {
    if signal::kill(Pid::from_raw(pid as i32), None).is_err() {
        return false;
    }
    // third field of /proc/<pid>/stat is the process state
    std::fs::read_to_string(format!("/proc/{pid}/stat"))
        .ok()
        .and_then(|stat| stat.split_whitespace().nth(2).map(|state| !matches!(state, "Z" | "X")))
        .unwrap_or(true)
}

/// Keeps a child PID registered for as long as the guard lives
pub struct RegisteredChild {
    pid: u32,
    registry: Arc<Mutex<ChildRegistry>>,
}

impl RegisteredChild {
    pub fn new(pid: u32) -> Self {
        Self::in_registry(pid, ChildRegistry::global())
    }

    pub fn in_registry(pid: u32, registry: Arc<Mutex<ChildRegistry>>) -> Self {
        if let Ok(mut guard) = registry.lock() {
            guard.register(pid);
        }
        Self { pid, registry }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl Drop for RegisteredChild {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.registry.lock() {
            guard.unregister(self.pid);
        }
    }
}

/// Install SIGINT/SIGTERM/SIGHUP handlers that stop running tools and exit
/// with `128 + signal`. Call once at program start.
pub fn init_signal_handlers() -> Result<(), std::io::Error> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;

    std::thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            let name = match sig {
                SIGINT => "SIGINT",
                SIGTERM => "SIGTERM",
                SIGHUP => "SIGHUP",
                _ => "signal",
            };
            warn!("Received {}, stopping running tools...", name);
            if let Ok(mut registry) = ChildRegistry::global().lock() {
                let killed = registry.terminate_all(SHUTDOWN_GRACE);
                if killed > 0 {
                    warn!("Killed {} tool process group(s); state locks may need `terraform force-unlock`", killed);
                }
            }
            std::process::exit(128 + sig);
        }
    });

    Ok(())
}

/// Extension trait for std::process::Command to set up process groups
pub trait CommandProcessGroup {
    /// Run the command as leader of a new process group
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl CommandProcessGroup for std::process::Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        self.process_group(0);

        // Children receive SIGTERM if the orchestrator dies without cleanup
        #[cfg(target_os = "linux")]
        unsafe {
            self.pre_exec(|| {
                use nix::libc;
                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
        self
    }
}
