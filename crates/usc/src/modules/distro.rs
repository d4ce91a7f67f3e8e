//! Distribution backends for packages and services.
//!
//! Backends are picked by probing `PATH` through the runner, so dry runs and
//! tests see the same choice a real run would.

use usc_dispatch::{ExecContext, HandlerError};
use usc_exec::{CommandLine, ExecError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Dnf,
    Yum,
    Apt,
    AptGet,
    Zypper,
    Pacman,
}

/// A package operation, independent of the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageOp<'a> {
    Install(&'a str),
    Remove { name: &'a str, purge: bool },
    /// `None` upgrades everything.
    Update(Option<&'a str>),
    Search(&'a str),
    List(Option<&'a str>),
    Info(&'a str),
}

impl PackageManager {
    /// Probe order when more than one is installed.
    pub const ALL: [PackageManager; 6] = [
        PackageManager::Dnf,
        PackageManager::Yum,
        PackageManager::Apt,
        PackageManager::AptGet,
        PackageManager::Zypper,
        PackageManager::Pacman,
    ];

    pub fn program(self) -> &'static str {
        match self {
            PackageManager::Dnf => "dnf",
            PackageManager::Yum => "yum",
            PackageManager::Apt => "apt",
            PackageManager::AptGet => "apt-get",
            PackageManager::Zypper => "zypper",
            PackageManager::Pacman => "pacman",
        }
    }

    pub fn detect(ctx: &ExecContext<'_>) -> Result<Self, HandlerError> {
        let found = Self::ALL.into_iter().find(|pm| ctx.has_program(pm.program()));
        match found {
            Some(pm) => {
                tracing::debug!(backend = pm.program(), "package manager detected");
                Ok(pm)
            }
            None => Err(ExecError::CommandNotFound {
                program: Self::ALL.map(Self::program).join("|"),
            }
            .into()),
        }
    }

    /// The command lines for `op`, in the order they must run.
    pub fn commands(self, op: PackageOp<'_>, ctx: &ExecContext<'_>) -> Vec<CommandLine> {
        let sudo = |program: &str| ctx.privileged(program);
        let plain = |program: &str| CommandLine::new(program);
        use PackageManager::*;
        use PackageOp::*;

        match (self, op) {
            (Dnf | Yum, Install(name)) => vec![sudo(self.program()).args(["install", "-y", name])],
            (Dnf | Yum, Remove { name, .. }) => vec![sudo(self.program()).args(["remove", "-y", name])],
            (Dnf | Yum, Update(name)) => {
                vec![sudo(self.program()).args(["update", "-y"]).args(name)]
            }
            (Dnf | Yum, Search(term)) => vec![plain(self.program()).args(["search", term])],
            (Dnf | Yum, List(filter)) => {
                vec![plain(self.program()).args(["list", "installed"]).args(filter)]
            }
            (Dnf | Yum, Info(name)) => vec![plain(self.program()).args(["info", name])],

            (Apt | AptGet, Install(name)) => vec![sudo(self.program()).args(["install", "-y", name])],
            (Apt | AptGet, Remove { name, purge }) => vec![sudo(self.program())
                .arg(if purge { "purge" } else { "remove" })
                .args(["-y", name])],
            (Apt | AptGet, Update(Some(name))) => vec![sudo(self.program())
                .args(["install", "--only-upgrade", "-y", name])],
            (Apt | AptGet, Update(None)) => vec![
                sudo(self.program()).arg("update"),
                sudo(self.program()).args(["upgrade", "-y"]),
            ],
            (Apt, Search(term)) => vec![plain("apt").args(["search", term])],
            (Apt, List(filter)) => vec![plain("apt").args(["list", "--installed"]).args(filter)],
            (Apt, Info(name)) => vec![plain("apt").args(["show", name])],
            (AptGet, Search(term)) => vec![plain("apt-cache").args(["search", term])],
            (AptGet, List(filter)) => vec![plain("dpkg").arg("-l").args(filter)],
            (AptGet, Info(name)) => vec![plain("apt-cache").args(["show", name])],

            (Zypper, Install(name)) => vec![sudo("zypper").args(["install", "-y", name])],
            (Zypper, Remove { name, .. }) => vec![sudo("zypper").args(["remove", "-y", name])],
            (Zypper, Update(Some(name))) => vec![sudo("zypper").args(["update", "-y", name])],
            (Zypper, Update(None)) => vec![
                sudo("zypper").arg("refresh"),
                sudo("zypper").args(["update", "-y"]),
            ],
            (Zypper, Search(term)) => vec![plain("zypper").args(["search", term])],
            (Zypper, List(filter)) => vec![plain("zypper").args(["search", "-i"]).args(filter)],
            (Zypper, Info(name)) => vec![plain("zypper").args(["info", name])],

            (Pacman, Install(name)) => vec![sudo("pacman").args(["-S", "--noconfirm", name])],
            (Pacman, Remove { name, purge }) => vec![sudo("pacman")
                .arg(if purge { "-Rns" } else { "-R" })
                .args(["--noconfirm", name])],
            (Pacman, Update(Some(name))) => vec![sudo("pacman").args(["-S", "--noconfirm", name])],
            (Pacman, Update(None)) => vec![sudo("pacman").args(["-Syu", "--noconfirm"])],
            (Pacman, Search(term)) => vec![plain("pacman").args(["-Ss", term])],
            (Pacman, List(filter)) => vec![plain("pacman").arg("-Q").args(filter)],
            (Pacman, Info(name)) => vec![plain("pacman").args(["-Si", name])],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceManager {
    Systemd,
    /// `service` plus `chkconfig`.
    SysV,
}

impl ServiceManager {
    pub fn detect(ctx: &ExecContext<'_>) -> Result<Self, HandlerError> {
        if ctx.has_program("systemctl") {
            Ok(ServiceManager::Systemd)
        } else if ctx.has_program("service") {
            Ok(ServiceManager::SysV)
        } else {
            Err(ExecError::CommandNotFound {
                program: "systemctl|service".into(),
            }
            .into())
        }
    }

    /// Lists services; `state` is `all`, `running` or `failed`.
    pub fn list(self, state: &str) -> CommandLine {
        match self {
            ServiceManager::Systemd => {
                let cmd = CommandLine::new("systemctl").args(["list-units", "--type=service", "--no-pager"]);
                match state {
                    "all" => cmd.arg("--all"),
                    other => cmd.arg(format!("--state={}", other)),
                }
            }
            ServiceManager::SysV => CommandLine::new("service").arg("--status-all"),
        }
    }

    /// A state-changing or status command for one service.
    pub fn control(self, verb: &str, name: &str, ctx: &ExecContext<'_>) -> Result<CommandLine, HandlerError> {
        let cmd = match (self, verb) {
            (ServiceManager::Systemd, "status") => {
                CommandLine::new("systemctl").args(["status", "--no-pager", name])
            }
            (ServiceManager::Systemd, _) => ctx.privileged("systemctl").args([verb, name]),
            (ServiceManager::SysV, "status") => CommandLine::new("service").args([name, "status"]),
            (ServiceManager::SysV, "start" | "stop" | "restart") => {
                ctx.privileged("service").args([name, verb])
            }
            (ServiceManager::SysV, "enable") => ctx.privileged("chkconfig").args([name, "on"]),
            (ServiceManager::SysV, "disable") => ctx.privileged("chkconfig").args([name, "off"]),
            (ServiceManager::SysV, other) => {
                return Err(HandlerError::invalid(
                    "action",
                    other,
                    "an action supported without systemd",
                ))
            }
        };
        Ok(cmd)
    }
}
