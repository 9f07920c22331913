use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use crate::consts::{BLOCK_SIZE, Inumber};
use crate::driver::file_drive::FileDrive;
use crate::fs::FileSystem;
use crate::util::error::FsError;

mod blockmap;
mod consts;
mod driver;
mod fs;
mod io;
mod structure;
mod util;

/// Shell over an inode filesystem on a file-backed disk image.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Disk image path; created when it does not exist.
    image: PathBuf,

    /// Emulated disk size in 4096-byte blocks (used when creating the image).
    blocks: u32,

    /// Emulated sector size in bytes.
    #[arg(long, default_value_t = 512)]
    sector_size: usize,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    if cli.sector_size == 0 || BLOCK_SIZE % cli.sector_size != 0 {
        eprintln!("sector size must divide the {BLOCK_SIZE}-byte block size");
        return ExitCode::FAILURE;
    }

    let drive = match open_drive(&cli) {
        Ok(drive) => drive,
        Err(err) => {
            eprintln!("{}: {err}", cli.image.display());
            return ExitCode::FAILURE;
        }
    };
    let mut fs = FileSystem::new(drive);

    println!("opened {} ({} blocks); type `help` for commands", cli.image.display(), cli.blocks);
    let stdin = std::io::stdin();
    loop {
        print!("sfs> ");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        if dispatch(&mut fs, &line) {
            break;
        }
    }
    ExitCode::SUCCESS
}

fn open_drive(cli: &Cli) -> std::io::Result<FileDrive> {
    if cli.image.exists() {
        FileDrive::open(&cli.image, cli.sector_size)
    } else {
        let sectors = cli.blocks as u64 * (BLOCK_SIZE / cli.sector_size) as u64;
        FileDrive::create(&cli.image, sectors, cli.sector_size)
    }
}

/// Runs one shell line; returns true when the session should end.
fn dispatch(fs: &mut FileSystem<FileDrive>, line: &str) -> bool {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return false;
    };

    let outcome = match command {
        "help" => {
            print_help();
            Ok(())
        }
        "quit" | "exit" => return true,
        "format" => fs.format().map(|()| println!("disk formatted")),
        "mount" => fs.mount().map(|()| println!("disk mounted")),
        "debug" => fs.debug_report().map(|report| print!("{report}")),
        "create" => fs.create().map(|inumber| println!("created inode {inumber}")),
        "delete" => match parse_inumber(words.next()) {
            Some(inumber) => fs.delete(inumber).map(|()| println!("deleted inode {inumber}")),
            None => usage("delete <inumber>"),
        },
        "getsize" => match parse_inumber(words.next()) {
            Some(inumber) => fs.getsize(inumber).map(|size| println!("inode {inumber}: {size} bytes")),
            None => usage("getsize <inumber>"),
        },
        "cat" => match parse_inumber(words.next()) {
            Some(inumber) => cat(fs, inumber),
            None => usage("cat <inumber>"),
        },
        "copyin" => match (words.next(), parse_inumber(words.next())) {
            (Some(path), Some(inumber)) => copyin(fs, path, inumber),
            _ => usage("copyin <file> <inumber>"),
        },
        "copyout" => match (parse_inumber(words.next()), words.next()) {
            (Some(inumber), Some(path)) => copyout(fs, inumber, path),
            _ => usage("copyout <inumber> <file>"),
        },
        other => {
            eprintln!("unknown command `{other}`; type `help`");
            Ok(())
        }
    };

    if let Err(err) = outcome {
        eprintln!("{command} failed: {err} (errno {})", err.errno());
    }
    false
}

fn parse_inumber(word: Option<&str>) -> Option<Inumber> {
    word.and_then(|word| word.parse().ok())
}

fn usage(text: &str) -> Result<(), FsError> {
    eprintln!("usage: {text}");
    Ok(())
}

fn print_help() {
    println!("commands:");
    println!("    format                     write an empty filesystem");
    println!("    mount                      mount the filesystem");
    println!("    debug                      dump superblock and inodes");
    println!("    create                     allocate a new inode");
    println!("    delete <inumber>           remove an inode and its data");
    println!("    getsize <inumber>          report the logical size");
    println!("    cat <inumber>              print file contents");
    println!("    copyin <file> <inumber>    copy a host file in");
    println!("    copyout <inumber> <file>   copy a file out to the host");
    println!("    quit");
}

fn copyin(fs: &mut FileSystem<FileDrive>, path: &str, inumber: Inumber) -> Result<(), FsError> {
    let data = std::fs::read(path).map_err(FsError::Device)?;

    let mut offset = 0usize;
    while offset < data.len() {
        let chunk = (data.len() - offset).min(BLOCK_SIZE);
        let copied = fs.write(inumber, &data[offset..offset + chunk], offset as u32)?;
        offset += copied;
        if copied < chunk {
            eprintln!("disk full after {offset} bytes");
            break;
        }
    }
    println!("copied {offset} bytes into inode {inumber}");
    Ok(())
}

fn copyout(fs: &FileSystem<FileDrive>, inumber: Inumber, path: &str) -> Result<(), FsError> {
    let data = slurp(fs, inumber)?;
    std::fs::write(path, &data).map_err(FsError::Device)?;
    println!("copied {} bytes out of inode {inumber}", data.len());
    Ok(())
}

fn cat(fs: &FileSystem<FileDrive>, inumber: Inumber) -> Result<(), FsError> {
    let data = slurp(fs, inumber)?;
    std::io::stdout().write_all(&data).map_err(FsError::Device)?;
    Ok(())
}

fn slurp(fs: &FileSystem<FileDrive>, inumber: Inumber) -> Result<Vec<u8>, FsError> {
    let mut data = Vec::new();
    let mut buffer = vec![0u8; BLOCK_SIZE];
    loop {
        let count = fs.read(inumber, &mut buffer, data.len() as u32)?;
        if count == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..count]);
    }
    Ok(data)
}
