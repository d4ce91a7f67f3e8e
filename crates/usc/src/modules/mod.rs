//! The built-in modules.
//!
//! Each module is a unit struct implementing [`Module`]. Handlers only build
//! argv vectors and run them through the [`ExecContext`](usc_dispatch::ExecContext);
//! nothing here touches the filesystem or system databases directly.

mod disk;
mod distro;
mod file;
mod group;
mod network;
mod package;
mod process;
mod service;
mod system;
mod user;

pub use disk::Disk;
pub use distro::{PackageManager, PackageOp, ServiceManager};
pub use file::File;
pub use group::Group;
pub use network::Network;
pub use package::Package;
pub use process::Process;
pub use service::Service;
pub use system::System;
pub use user::User;

use usc_dispatch::{Call, HandlerError, Module, Registry, RegistryError};

/// Ids below this are system accounts and groups.
const SYSTEM_ID_LIMIT: u32 = 1000;

/// Builds the registry of every built-in module.
pub fn builtin_registry() -> Result<Registry, RegistryError> {
    builtin_modules()
        .into_iter()
        .fold(Registry::builder(), |builder, module| builder.boxed(module))
        .build()
}

fn builtin_modules() -> Vec<Box<dyn Module>> {
    vec![
        Box::new(User),
        Box::new(Group),
        Box::new(File),
        Box::new(Network),
        Box::new(System),
        Box::new(Process),
        Box::new(Service),
        Box::new(Disk),
        Box::new(Package),
    ]
}

/// The error for a declared action with no handler arm.
fn unhandled(call: &Call) -> HandlerError {
    HandlerError::invalid(
        "action",
        call.action.clone(),
        format!("an action of the `{}` module", call.module),
    )
}

/// Lays out rows as columns separated by at least two spaces.
fn columns(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let line = |cells: Vec<&str>| -> String {
        let last = cells.len().saturating_sub(1);
        let mut out = String::new();
        for (i, cell) in cells.into_iter().enumerate() {
            if i == last {
                out.push_str(cell);
            } else {
                out.push_str(&format!("{:<width$}  ", cell, width = widths[i]));
            }
        }
        out.trim_end().to_string()
    };

    let mut text = line(headers.to_vec());
    text.push('\n');
    for row in rows {
        text.push_str(&line(row.iter().map(String::as_str).collect()));
        text.push('\n');
    }
    text
}
