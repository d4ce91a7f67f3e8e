//! `disk`: block devices and filesystems through util-linux, e2fsprogs and
//! the mkfs family.

use super::unhandled;
use serde_json::json;
use usc_dispatch::{
    one_of, ActionResult, ActionSpec, Call, ExecContext, HandlerError, HandlerResult, Module,
    ModuleSpec, ParameterSpec,
};
use usc_exec::CommandLine;

const LSBLK_COLUMNS: &str = "NAME,SIZE,TYPE,FSTYPE,MOUNTPOINT";

const FILESYSTEMS: &[&str] = &["ext2", "ext3", "ext4", "xfs", "btrfs", "ntfs", "fat16", "fat32", "swap"];

pub struct Disk;

impl Module for Disk {
    fn spec(&self) -> ModuleSpec {
        ModuleSpec::new("disk", "Inspect, format, mount and check disks")
            .action(
                ActionSpec::new("list", "List block devices and partition tables")
                    .param(ParameterSpec::primary("item", "disk, partition or all").default("all"))
                    .param(ParameterSpec::named("format", "lsblk columns").default(LSBLK_COLUMNS))
                    .param(ParameterSpec::named("device", "Only this device's partition table"))
                    .note("Partition tables are read with fdisk and need root.")
                    .example("usc disk list:disk format:NAME,SIZE,MODEL", "Disks with their model"),
            )
            .action(
                ActionSpec::new("info", "Show one device's filesystems")
                    .param(ParameterSpec::primary("device", "Device path, e.g. /dev/sda"))
                    .param(ParameterSpec::named("format", "lsblk columns instead of the filesystem view"))
                    .example("usc disk info:/dev/sda", "Filesystems, labels and UUIDs on sda"),
            )
            .action(
                ActionSpec::new("format", "Create a filesystem")
                    .param(ParameterSpec::primary("device", "Partition to format"))
                    .param(ParameterSpec::named(
                        "type",
                        "ext2, ext3, ext4, xfs, btrfs, ntfs, fat16, fat32 or swap",
                    ))
                    .param(ParameterSpec::named("label", "Filesystem label"))
                    .param(ParameterSpec::flag("force", "Overwrite an existing filesystem"))
                    .note("This destroys everything on the device.")
                    .usage("usc disk format:<device> type:<type>")
                    .example("usc disk format:/dev/sdb1 type:ext4 label:data", "Make an ext4 filesystem"),
            )
            .action(
                ActionSpec::new("mount", "Mount a filesystem")
                    .param(ParameterSpec::primary("device", "Device or source to mount"))
                    .param(ParameterSpec::named("path", "Mount point"))
                    .param(ParameterSpec::named("type", "Filesystem type"))
                    .param(ParameterSpec::named("options", "Mount options, e.g. ro,noatime"))
                    .usage("usc disk mount:<device> path:<path>")
                    .example("usc disk mount:/dev/sdb1 path:/mnt/data options:noatime", "Mount a data disk"),
            )
            .action(
                ActionSpec::new("unmount", "Unmount a filesystem")
                    .param(ParameterSpec::primary("path", "Mount point or device"))
                    .param(ParameterSpec::flag("force", "Force the unmount"))
                    .param(ParameterSpec::flag("lazy", "Detach now, clean up when no longer busy"))
                    .example("usc disk unmount:/mnt/data lazy:true", "Detach a busy mount"),
            )
            .action(
                ActionSpec::new("fsck", "Check and repair a filesystem")
                    .param(ParameterSpec::primary("device", "Unmounted device to check"))
                    .param(ParameterSpec::named("type", "Filesystem type"))
                    .param(ParameterSpec::flag("force", "Check even if the filesystem seems clean"))
                    .param(ParameterSpec::flag("auto", "Repair without asking"))
                    .param(ParameterSpec::flag("no_repair", "Only report problems"))
                    .example("usc disk fsck:/dev/sdb1 no_repair:true", "Check without changing anything"),
            )
            .action(
                ActionSpec::new("usage", "Show filesystem space usage")
                    .param(ParameterSpec::primary("path", "Only the filesystem holding this path").optional())
                    .param(ParameterSpec::flag("human_readable", "Sizes in K, M and G"))
                    .param(ParameterSpec::flag("inode", "Inode usage instead of blocks"))
                    .example("usc disk usage:/ human_readable:true", "Space left on the root filesystem"),
            )
            .action(
                ActionSpec::new("uuid", "List, read or change filesystem UUIDs")
                    .param(ParameterSpec::primary("operation", "list, get or set"))
                    .param(ParameterSpec::named("device", "Device path"))
                    .param(ParameterSpec::named("uuid", "New UUID, or random, time or clear (ext filesystems)"))
                    .example("usc disk uuid:get device:/dev/sda1", "Print sda1's UUID")
                    .example("usc disk uuid:set device:/dev/sdb1 uuid:random", "Give sdb1 a new UUID"),
            )
    }

    fn handle(&self, call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
        let value = call.action_value();
        match call.action.as_str() {
            "list" => list(call, ctx),
            "info" => {
                let cmd = match call.get("format") {
                    Some(columns) => CommandLine::new("lsblk").args(["-o", columns, value]),
                    None => CommandLine::new("lsblk").args(["-f", value]),
                };
                Ok(ctx.run(&cmd)?.into())
            }
            "format" => {
                let cmd = mkfs(call, ctx)?;
                let out = ctx.run(&cmd)?;
                Ok(ActionResult::from(out).with_data(json!({
                    "device": value,
                    "type": call.get("type"),
                    "label": call.get("label"),
                })))
            }
            "mount" => {
                let path = call.require("path", "`disk mount` needs a mount point")?;
                let cmd = ctx
                    .privileged("mount")
                    .opt("-t", call.get("type"))
                    .opt("-o", call.get("options"))
                    .args([value, path]);
                Ok(ctx.run(&cmd)?.into())
            }
            "unmount" => {
                let cmd = ctx
                    .privileged("umount")
                    .arg_if(call.flag("force"), "-f")
                    .arg_if(call.flag("lazy"), "-l")
                    .arg(value);
                Ok(ctx.run(&cmd)?.into())
            }
            "fsck" => {
                let cmd = ctx
                    .privileged("fsck")
                    .opt("-t", call.get("type"))
                    .arg_if(call.flag("force"), "-f")
                    .arg_if(call.flag("auto"), "-a")
                    .arg_if(call.flag("no_repair"), "-n")
                    .arg(value);
                Ok(ctx.run(&cmd)?.into())
            }
            "usage" => {
                let cmd = CommandLine::new("df")
                    .arg_if(call.flag("human_readable"), "-h")
                    .arg_if(call.flag("inode"), "-i")
                    .args(Some(value).filter(|v| !v.is_empty()));
                Ok(ctx.run(&cmd)?.into())
            }
            "uuid" => uuid(call, ctx),
            _ => Err(unhandled(call)),
        }
    }
}

fn list(call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
    let item = call.value_in(&["disk", "partition", "all"])?;
    let mut cmds = Vec::new();
    if item != "partition" {
        cmds.push(CommandLine::new("lsblk").args(["-o", call.get("format").unwrap_or(LSBLK_COLUMNS)]));
    }
    if item != "disk" {
        cmds.push(ctx.privileged("fdisk").arg("-l").args(call.get("device")));
    }

    let mut stdout = String::new();
    let mut last = None;
    for cmd in &cmds {
        let out = ctx.run(cmd)?;
        if !stdout.is_empty() {
            stdout.push('\n');
        }
        stdout.push_str(&out.stdout);
        last = Some(out);
    }
    let mut result = last.map(ActionResult::from).unwrap_or_default();
    result.stdout = stdout;
    Ok(result)
}

fn mkfs(call: &Call, ctx: &ExecContext<'_>) -> Result<CommandLine, HandlerError> {
    let fs = call.require("type", "`disk format` needs a filesystem type")?;
    let fs = fs.to_ascii_lowercase();
    let fs = one_of("type", &fs, FILESYSTEMS)?;
    let force = call.flag("force");
    let label = call.get("label");

    let cmd = match fs {
        "ext2" | "ext3" | "ext4" => ctx
            .privileged(&format!("mkfs.{}", fs))
            .arg_if(force, "-F")
            .opt("-L", label),
        "xfs" | "btrfs" => ctx
            .privileged(&format!("mkfs.{}", fs))
            .arg_if(force, "-f")
            .opt("-L", label),
        "ntfs" => ctx.privileged("mkfs.ntfs").arg_if(force, "-F").opt("-L", label),
        "fat16" | "fat32" => ctx
            .privileged("mkfs.vfat")
            .args(["-F", &fs[3..]])
            .opt("-n", label),
        _ => ctx.privileged("mkswap").arg_if(force, "-f").opt("-L", label),
    };
    Ok(cmd.arg(call.action_value()))
}

fn uuid(call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
    let operation = call.value_in(&["list", "get", "set"])?;
    let cmd = match operation {
        "list" => ctx.privileged("blkid").args(call.get("device")),
        "get" => {
            let device = call.require("device", "`uuid:get` needs a device")?;
            ctx.privileged("blkid").args(["-o", "value", "-s", "UUID", device])
        }
        _ => {
            let device = call.require("device", "`uuid:set` needs a device")?;
            let uuid = call.require("uuid", "`uuid:set` needs the new UUID")?;
            if !is_uuid_argument(uuid) {
                return Err(HandlerError::invalid("uuid", uuid, "a UUID, random, time or clear"));
            }
            ctx.privileged("tune2fs").args(["-U", uuid, device])
        }
    };
    let out = ctx.run(&cmd)?;
    if operation == "get" {
        let uuid = out.stdout.trim().to_string();
        return Ok(ActionResult::from(out).with_data(json!({ "uuid": uuid })));
    }
    Ok(out.into())
}

fn is_uuid_argument(value: &str) -> bool {
    if matches!(value, "random" | "time" | "clear") {
        return true;
    }
    value.len() == 36
        && value.char_indices().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_hexdigit(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use usc_exec::testing::{Reply, ScriptedRunner};

    fn disk(action: &str, primary: &str, value: &str) -> Call {
        Call::new("disk", action).primary(primary, value)
    }

    fn lines(call: Call) -> Vec<String> {
        let runner = ScriptedRunner::new();
        let ctx = ExecContext::new(&runner, true);
        Disk.handle(&call, &ctx).unwrap();
        runner.lines()
    }

    #[test]
    fn test_list_all_runs_both() {
        let runner = ScriptedRunner::new()
            .reply("lsblk", Reply::ok("NAME SIZE\nsda  20G\n"))
            .reply("fdisk", Reply::ok("Disk /dev/sda: 20 GiB\n"));
        let ctx = ExecContext::new(&runner, true);
        let call = disk("list", "item", "all").param("format", LSBLK_COLUMNS);

        let result = Disk.handle(&call, &ctx).unwrap();
        assert_eq!(
            runner.lines(),
            ["lsblk -o NAME,SIZE,TYPE,FSTYPE,MOUNTPOINT", "sudo fdisk -l"]
        );
        assert_eq!(result.stdout, "NAME SIZE\nsda  20G\n\nDisk /dev/sda: 20 GiB\n");
    }

    #[test]
    fn test_list_partitions_of_one_device() {
        assert_eq!(
            lines(disk("list", "item", "partition").param("device", "/dev/sdb")),
            ["sudo fdisk -l /dev/sdb"]
        );
    }

    #[test]
    fn test_format() {
        assert_eq!(
            lines(disk("format", "device", "/dev/sdb1").param("type", "ext4").param("label", "data").param("force", "true")),
            ["sudo mkfs.ext4 -F -L data /dev/sdb1"]
        );
        assert_eq!(
            lines(disk("format", "device", "/dev/sdc1").param("type", "FAT32").param("label", "USB")),
            ["sudo mkfs.vfat -F 32 -n USB /dev/sdc1"]
        );
    }

    #[test]
    fn test_format_rejects_unknown_type() {
        let runner = ScriptedRunner::new();
        let ctx = ExecContext::new(&runner, true);
        let err = Disk
            .handle(&disk("format", "device", "/dev/sdb1").param("type", "zfs"), &ctx)
            .unwrap_err();
        assert!(matches!(err, HandlerError::InvalidValue { .. }));
        let err = Disk.handle(&disk("format", "device", "/dev/sdb1"), &ctx).unwrap_err();
        assert!(matches!(err, HandlerError::MissingParameter { .. }));
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn test_mount_and_unmount() {
        assert_eq!(
            lines(disk("mount", "device", "/dev/sdb1").param("path", "/mnt/data").param("options", "ro,noatime")),
            ["sudo mount -o ro,noatime /dev/sdb1 /mnt/data"]
        );
        assert_eq!(
            lines(disk("unmount", "path", "/mnt/data").param("lazy", "true")),
            ["sudo umount -l /mnt/data"]
        );
    }

    #[test]
    fn test_usage_is_unprivileged() {
        assert_eq!(
            lines(disk("usage", "path", "/").param("human_readable", "true")),
            ["df -h /"]
        );
        assert_eq!(lines(disk("usage", "path", "")), ["df"]);
    }

    #[test]
    fn test_uuid() {
        let runner = ScriptedRunner::new().reply("blkid", Reply::ok("1b2c3d4e-0000-4000-8000-123456789abc\n"));
        let ctx = ExecContext::new(&runner, true);
        let result = Disk
            .handle(&disk("uuid", "operation", "get").param("device", "/dev/sda1"), &ctx)
            .unwrap();
        assert_eq!(runner.lines(), ["sudo blkid -o value -s UUID /dev/sda1"]);
        assert_eq!(result.data.unwrap()["uuid"], json!("1b2c3d4e-0000-4000-8000-123456789abc"));

        assert_eq!(
            lines(disk("uuid", "operation", "set").param("device", "/dev/sdb1").param("uuid", "random")),
            ["sudo tune2fs -U random /dev/sdb1"]
        );
        assert!(!is_uuid_argument("not-a-uuid"));
    }
}
