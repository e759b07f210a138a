//! The interactive shell: a line-oriented command dispatcher over the
//! filesystem, process, and network syscall surfaces (spec §6.5).
//!
//! The shell itself runs as an ordinary user process (spec §2's boot path
//! starts it as pid 2, right after the idle kernel thread), so it talks to
//! the rest of the kernel only through the same syscall-shaped functions a
//! userland program would use.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::block::BlockDevice;
use crate::fs::Filesystem;
use crate::lib::error::Errno;
use crate::net::iface::INTERFACES;
use crate::process::table::PCB_TABLE;
use crate::{error, info};

/// What the shell's main loop should do after a command returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellOutcome {
    Continue,
    Exit,
}

/// Everything a command needs: the mounted filesystem, the working
/// directory inode, and the shell process's own pid (for `exit`).
pub struct ShellContext<'a, D: BlockDevice> {
    pub fs: &'a mut Filesystem<D>,
    pub cwd: u16,
    pub pid: i16,
}

const RUN_USAGE: &str = "usage: run -c <path> | run -h";

/// Parse and execute one command line. Errors are already reported to the
/// kernel log by the time this returns — the caller doesn't need to print
/// anything further.
pub fn dispatch<D: BlockDevice>(line: &str, ctx: &mut ShellContext<D>) -> Result<ShellOutcome, Errno> {
    let mut parts = line.split_whitespace();
    let cmd = match parts.next() {
        Some(c) => c,
        None => return Ok(ShellOutcome::Continue),
    };
    let args: Vec<&str> = parts.collect();

    let result = match cmd {
        "ls" => cmd_ls(ctx),
        "cat" => cmd_cat(ctx, &args),
        "cd" => cmd_cd(ctx, &args),
        "mkdir" => cmd_mkdir(ctx, &args),
        "touch" => cmd_touch(ctx, &args),
        "ps" => cmd_ps(),
        "ths" => cmd_ths(),
        "th" => cmd_th(&args),
        "run" => cmd_run(ctx, &args),
        "dig" => cmd_dig(&args),
        "ping" => cmd_ping(&args),
        "exit" => return cmd_exit(ctx).map(|()| ShellOutcome::Exit),
        other => {
            error!("unknown command: {other}");
            return Err(Errno::Einval);
        }
    };

    result.map(|()| ShellOutcome::Continue).map_err(|err| {
        error!("{cmd}: {}", err.description());
        err
    })
}

fn cmd_ls<D: BlockDevice>(ctx: &mut ShellContext<D>) -> Result<(), Errno> {
    let entries = ctx.fs.listdir(ctx.cwd)?;
    for (name, is_dir) in entries {
        info!("{}{}", name, if is_dir { "/" } else { "" });
    }
    Ok(())
}

fn cmd_cat<D: BlockDevice>(ctx: &mut ShellContext<D>, args: &[&str]) -> Result<(), Errno> {
    let name = args.first().ok_or(Errno::Einval)?;
    let fd = ctx.fs.open(ctx.cwd, name)?;
    let mut buf = [0u8; crate::fs::MAX_FILE_SIZE];
    let read = ctx.fs.read(fd, &mut buf);
    ctx.fs.close(fd)?;
    let read = read?;
    info!("{}", String::from_utf8_lossy(&buf[..read]));
    Ok(())
}

fn cmd_cd<D: BlockDevice>(ctx: &mut ShellContext<D>, args: &[&str]) -> Result<(), Errno> {
    let name = args.first().ok_or(Errno::Einval)?;
    ctx.cwd = ctx.fs.chdir(ctx.cwd, name)?;
    Ok(())
}

fn cmd_mkdir<D: BlockDevice>(ctx: &mut ShellContext<D>, args: &[&str]) -> Result<(), Errno> {
    let name = args.first().ok_or(Errno::Einval)?;
    ctx.fs.mkdir(ctx.cwd, name)?;
    Ok(())
}

fn cmd_touch<D: BlockDevice>(ctx: &mut ShellContext<D>, args: &[&str]) -> Result<(), Errno> {
    let name = args.first().ok_or(Errno::Einval)?;
    ctx.fs.create(ctx.cwd, name)?;
    Ok(())
}

fn cmd_ps() -> Result<(), Errno> {
    for pcb in PCB_TABLE.lock().iter() {
        info!("{}", pcb.dbg_dump());
    }
    Ok(())
}

fn cmd_ths() -> Result<(), Errno> {
    for pcb in PCB_TABLE.lock().iter().filter(|p| !p.is_process) {
        info!("{}", pcb.dbg_dump());
    }
    Ok(())
}

fn cmd_th(args: &[&str]) -> Result<(), Errno> {
    let id: i16 = args.first().ok_or(Errno::Einval)?.parse().map_err(|_| Errno::Einval)?;
    let table = PCB_TABLE.lock();
    let index = table.find_by_pid(id).ok_or(Errno::Enoent)?;
    info!("{}", table.get(index).unwrap().dbg_dump());
    Ok(())
}

/// `run -c <path>` loads the file at `path` as a program image and starts
/// it as a new process; `-h` prints usage; any other flag is an error.
fn cmd_run<D: BlockDevice>(ctx: &mut ShellContext<D>, args: &[&str]) -> Result<(), Errno> {
    let mut path: Option<&str> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i] {
            "-h" => {
                info!("{RUN_USAGE}");
                return Ok(());
            }
            "-c" => {
                i += 1;
                path = Some(*args.get(i).ok_or(Errno::Einval)?);
            }
            _ => {
                error!("{RUN_USAGE}");
                return Err(Errno::Einval);
            }
        }
        i += 1;
    }
    let path = path.ok_or(Errno::Einval)?;

    let fd = ctx.fs.open(ctx.cwd, path)?;
    let mut image = alloc::vec![0u8; crate::fs::MAX_FILE_SIZE];
    let read = ctx.fs.read(fd, &mut image);
    ctx.fs.close(fd)?;
    let read = read?;
    image.truncate(read);

    let index = crate::process::create_process(path, &image, Vec::new())?;
    let mut table = PCB_TABLE.lock();
    if let Some(pcb) = table.get_mut(index) {
        pcb.parent = Some(ctx.pid);
    }
    drop(table);
    crate::process::scheduler::enqueue_ready(index);
    Ok(())
}

/// Resolve a hostname to an IPv4 address. There's no real DNS client in
/// scope here: `localhost` and registered interface names resolve off the
/// interface table, and nothing else does.
fn resolve_host(host: &str) -> Result<u32, Errno> {
    if host == "localhost" {
        return Ok(u32::from_be_bytes([127, 0, 0, 1]));
    }
    let table = INTERFACES.lock();
    let index = table.find_by_name(host).ok_or(Errno::Enoent)?;
    Ok(table.get(index).unwrap().ip)
}

fn format_ip(ip: u32) -> String {
    let octets = ip.to_be_bytes();
    format!("{}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3])
}

fn cmd_dig(args: &[&str]) -> Result<(), Errno> {
    let host = args.first().ok_or(Errno::Einval)?;
    let ip = resolve_host(host)?;
    info!("{} has address {}", host, format_ip(ip));
    Ok(())
}

fn cmd_ping(args: &[&str]) -> Result<(), Errno> {
    let host = args.first().ok_or(Errno::Einval)?;
    let dst_ip = resolve_host(host)?;

    let table = INTERFACES.lock();
    let lo_index = table.find_by_name("lo").ok_or(Errno::Enodev)?;
    let lo = table.get(lo_index).unwrap();
    let src_ip = lo.ip;
    let our_mac = lo.mac;
    drop(table);

    let echo_request = {
        let mut out = alloc::vec![0u8; 8];
        out[0] = 8; // echo request
        let sum = crate::net::checksum::checksum(&out, 0);
        out[2..4].copy_from_slice(&sum.to_be_bytes());
        out
    };
    let ip_packet = crate::net::ip::build(src_ip, dst_ip, crate::net::skb::IpProtocol::Icmp, echo_request.len() as u16, 0);
    let mut payload = ip_packet;
    payload.extend_from_slice(&echo_request);
    let frame = crate::net::eth::build(our_mac, our_mac, 0x0800, &payload);
    crate::net::net_send_skb(crate::net::Skb::new(frame, lo_index));

    info!("PING {} ({}): queued", host, format_ip(dst_ip));
    Ok(())
}

fn cmd_exit<D: BlockDevice>(ctx: &mut ShellContext<D>) -> Result<(), Errno> {
    let index = PCB_TABLE.lock().find_by_pid(ctx.pid).ok_or(Errno::Enoent)?;
    crate::process::scheduler::exit(index);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::MemBlockDevice;

    fn fresh_fs() -> Filesystem<MemBlockDevice> {
        Filesystem::format(MemBlockDevice::new(256), 64, 200).unwrap()
    }

    #[test]
    fn touch_then_ls_shows_the_new_file() {
        let mut fs = fresh_fs();
        let root = Filesystem::<MemBlockDevice>::root_inode();
        let mut ctx = ShellContext { fs: &mut fs, cwd: root, pid: 99 };
        assert_eq!(dispatch("touch hello.txt", &mut ctx), Ok(ShellOutcome::Continue));
        assert_eq!(dispatch("ls", &mut ctx), Ok(ShellOutcome::Continue));
        let listing = ctx.fs.listdir(ctx.cwd).unwrap();
        assert!(listing.iter().any(|(n, _)| n == "hello.txt"));
    }

    #[test]
    fn mkdir_then_cd_changes_the_working_directory() {
        let mut fs = fresh_fs();
        let root = Filesystem::<MemBlockDevice>::root_inode();
        let mut ctx = ShellContext { fs: &mut fs, cwd: root, pid: 99 };
        dispatch("mkdir sub", &mut ctx).unwrap();
        dispatch("cd sub", &mut ctx).unwrap();
        assert_ne!(ctx.cwd, root);
    }

    #[test]
    fn cat_prints_the_file_contents() {
        let mut fs = fresh_fs();
        let root = Filesystem::<MemBlockDevice>::root_inode();
        fs.create(root, "x").unwrap();
        let fd = fs.open(root, "x").unwrap();
        fs.write(fd, b"hi").unwrap();
        fs.close(fd).unwrap();
        let mut ctx = ShellContext { fs: &mut fs, cwd: root, pid: 99 };
        assert_eq!(dispatch("cat x", &mut ctx), Ok(ShellOutcome::Continue));
    }

    #[test]
    fn run_with_an_unknown_flag_is_rejected() {
        let mut fs = fresh_fs();
        let root = Filesystem::<MemBlockDevice>::root_inode();
        let mut ctx = ShellContext { fs: &mut fs, cwd: root, pid: 99 };
        assert_eq!(dispatch("run --bogus", &mut ctx), Err(Errno::Einval));
    }

    #[test]
    fn dig_resolves_localhost_to_loopback() {
        let mut fs = fresh_fs();
        let root = Filesystem::<MemBlockDevice>::root_inode();
        let mut ctx = ShellContext { fs: &mut fs, cwd: root, pid: 99 };
        assert_eq!(dispatch("dig localhost", &mut ctx), Ok(ShellOutcome::Continue));
    }

    #[test]
    fn unknown_command_is_an_error() {
        let mut fs = fresh_fs();
        let root = Filesystem::<MemBlockDevice>::root_inode();
        let mut ctx = ShellContext { fs: &mut fs, cwd: root, pid: 99 };
        assert_eq!(dispatch("frobnicate", &mut ctx), Err(Errno::Einval));
    }
}
