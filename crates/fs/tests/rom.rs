use std::sync::Arc;

use fs::RomDevice;
use test_support::mock::rom::MemRomImage;
use vfs::{FileMode, FsError, OpenFlags, SeekWhence, TimeVal, Vfs};

fn sample_image() -> MemRomImage {
    MemRomImage::new()
        .file("/readme.txt", b"hello rom")
        .dir("/sub")
        .file("/sub/a.bin", &[1, 2, 3, 4, 5])
        .file("/sub/b.bin", &[9, 9])
}

fn mount() -> Vfs {
    let vfs = Vfs::new();
    let dev = RomDevice::new("rom", sample_image());
    vfs.devices().register(Arc::new(dev)).unwrap();
    vfs
}

#[test]
fn test_read_only_open_and_read() {
    let vfs = mount();
    let fd = vfs.open("rom:/readme.txt", OpenFlags::O_RDONLY).unwrap();
    let mut buf = [0u8; 32];
    let n = vfs.read(fd, &mut buf).unwrap();
    assert_eq!(&buf[..n], b"hello rom");
    assert_eq!(vfs.read(fd, &mut buf).unwrap(), 0);
    vfs.close(fd).unwrap();
}

#[test]
fn test_write_intent_flags_rejected() {
    let vfs = mount();
    for flags in [
        OpenFlags::O_WRONLY,
        OpenFlags::O_RDWR,
        OpenFlags::O_CREAT,
        OpenFlags::O_TRUNC,
        OpenFlags::O_APPEND,
        OpenFlags::O_WRONLY | OpenFlags::O_CREAT | OpenFlags::O_TRUNC,
    ] {
        assert_eq!(
            vfs.open("rom:/readme.txt", flags),
            Err(FsError::ReadOnlyFs)
        );
    }
}

#[test]
fn test_mutating_ops_fail_read_only_and_preserve_state() {
    let vfs = mount();

    let fd = vfs.open("rom:/sub/a.bin", OpenFlags::O_RDONLY).unwrap();
    assert_eq!(vfs.write(fd, b"xx"), Err(FsError::ReadOnlyFs));
    assert_eq!(vfs.ftruncate(fd, 1), Err(FsError::ReadOnlyFs));
    assert_eq!(vfs.fchmod(fd, FileMode::empty()), Err(FsError::ReadOnlyFs));

    assert_eq!(vfs.unlink("rom:/sub/a.bin"), Err(FsError::ReadOnlyFs));
    assert_eq!(
        vfs.mkdir("rom:/new", FileMode::empty()),
        Err(FsError::ReadOnlyFs)
    );
    assert_eq!(
        vfs.rename("rom:/sub/a.bin", "rom:/sub/c.bin"),
        Err(FsError::ReadOnlyFs)
    );
    assert_eq!(
        vfs.chmod("rom:/readme.txt", FileMode::empty()),
        Err(FsError::ReadOnlyFs)
    );
    assert_eq!(
        vfs.utimes("rom:/readme.txt", [TimeVal { sec: 0, usec: 0 }; 2]),
        Err(FsError::ReadOnlyFs)
    );
    assert_eq!(vfs.rmdir("rom:/sub"), Err(FsError::ReadOnlyFs));
    assert_eq!(
        vfs.link("rom:/readme.txt", "rom:/again"),
        Err(FsError::ReadOnlyFs)
    );
    assert_eq!(vfs.truncate("rom:/readme.txt", 0), Err(FsError::ReadOnlyFs));

    // 镜像内容不受影响
    let mut buf = [0u8; 8];
    let n = vfs.read(fd, &mut buf).unwrap();
    assert_eq!(&buf[..n], &[1, 2, 3, 4, 5]);
    vfs.close(fd).unwrap();
    assert_eq!(vfs.stat("rom:/sub/c.bin"), Err(FsError::NotFound));
    assert_eq!(vfs.stat("rom:/sub/a.bin").unwrap().size, 5);
}

#[test]
fn test_stat_reports_entry_kind() {
    let vfs = mount();
    let st = vfs.stat("rom:/readme.txt").unwrap();
    assert!(st.mode.is_file());
    assert_eq!(st.size, 9);

    let st = vfs.stat("rom:/sub").unwrap();
    assert!(st.mode.is_dir());

    let st = vfs.lstat("rom:/sub/a.bin").unwrap();
    assert_eq!(st.size, 5);

    let fd = vfs.open("rom:/sub/a.bin", OpenFlags::O_RDONLY).unwrap();
    assert_eq!(vfs.fstat(fd).unwrap().size, 5);
    vfs.close(fd).unwrap();
}

#[test]
fn test_open_directory_fails() {
    let vfs = mount();
    assert_eq!(
        vfs.open("rom:/sub", OpenFlags::O_RDONLY),
        Err(FsError::IsDirectory)
    );
}

#[test]
fn test_seek_within_image() {
    let vfs = mount();
    let fd = vfs.open("rom:/sub/a.bin", OpenFlags::O_RDONLY).unwrap();

    assert_eq!(vfs.lseek(fd, -2, SeekWhence::End).unwrap(), 3);
    let mut buf = [0u8; 8];
    assert_eq!(vfs.read(fd, &mut buf).unwrap(), 2);
    assert_eq!(&buf[..2], &[4, 5]);

    assert_eq!(
        vfs.lseek(fd, -1, SeekWhence::Set),
        Err(FsError::InvalidArgument)
    );
    // 越过末尾的定位允许，读返回 0
    assert_eq!(vfs.lseek(fd, 100, SeekWhence::Set).unwrap(), 100);
    assert_eq!(vfs.read(fd, &mut buf).unwrap(), 0);
    vfs.close(fd).unwrap();
}

#[test]
fn test_directory_enumeration() {
    let vfs = mount();
    let mut dir = vfs.opendir("rom:/sub").unwrap();
    let mut names = Vec::new();
    while let Some(entry) = vfs.readdir(&mut dir).unwrap() {
        names.push(entry.name);
    }
    assert_eq!(names, vec!["a.bin", "b.bin"]);

    vfs.rewinddir(&mut dir).unwrap();
    let first = vfs.readdir(&mut dir).unwrap().unwrap();
    assert_eq!(first.name, "a.bin");
    assert!(first.stat.mode.is_file());
    vfs.closedir(dir).unwrap();

    assert_eq!(
        vfs.opendir("rom:/readme.txt").unwrap_err(),
        FsError::NotDirectory
    );
}

#[test]
fn test_chdir_and_relative_reads() {
    let vfs = mount();
    vfs.chdir("rom:/sub").unwrap();
    assert_eq!(vfs.getcwd().unwrap(), "rom:/sub");

    let fd = vfs.open("b.bin", OpenFlags::O_RDONLY).unwrap();
    let mut buf = [0u8; 4];
    assert_eq!(vfs.read(fd, &mut buf).unwrap(), 2);
    assert_eq!(&buf[..2], &[9, 9]);
    vfs.close(fd).unwrap();

    assert_eq!(vfs.chdir("rom:/readme.txt"), Err(FsError::NotDirectory));
    assert_eq!(vfs.chdir("rom:/ghost"), Err(FsError::NotFound));
}

#[test]
fn test_statvfs_is_read_only() {
    let vfs = mount();
    let sv = vfs.statvfs("rom:/").unwrap();
    assert_ne!(sv.flag & uapi::fs::ST_RDONLY, 0);
}
