use std::io::Cursor;
use std::sync::Arc;

use fs::FatDevice;
use vfs::{FsError, OpenFlags, SeekWhence, Vfs};

fn new_volume() -> Cursor<Vec<u8>> {
    let mut storage = Cursor::new(vec![0u8; 1024 * 1024]);
    fatfs::format_volume(&mut storage, fatfs::FormatVolumeOptions::new()).unwrap();
    storage
}

fn mount(name: &str) -> Vfs {
    let vfs = Vfs::new();
    let dev = FatDevice::new(name, new_volume()).unwrap();
    vfs.devices().register(Arc::new(dev)).unwrap();
    vfs
}

fn read_all(vfs: &Vfs, fd: usize, len: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; 64];
    while out.len() < len {
        let n = vfs.read(fd, &mut buf).unwrap();
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    out
}

fn write_all(vfs: &Vfs, fd: usize, mut data: &[u8]) {
    while !data.is_empty() {
        let n = vfs.write(fd, data).unwrap();
        assert!(n > 0);
        data = &data[n..];
    }
}

#[test]
fn test_write_read_round_trip() {
    let vfs = mount("fat");
    let payload: Vec<u8> = (0..200u8).collect();

    let fd = vfs
        .open(
            "fat:/data.bin",
            OpenFlags::O_WRONLY | OpenFlags::O_CREAT | OpenFlags::O_TRUNC,
        )
        .unwrap();
    write_all(&vfs, fd, &payload);
    vfs.close(fd).unwrap();

    let fd = vfs.open("fat:/data.bin", OpenFlags::O_RDONLY).unwrap();
    assert_eq!(read_all(&vfs, fd, payload.len()), payload);
    assert_eq!(vfs.read(fd, &mut [0u8; 16]).unwrap(), 0);
    vfs.close(fd).unwrap();
}

#[test]
fn test_bare_create_is_rejected() {
    let vfs = mount("fat");
    assert_eq!(
        vfs.open("fat:/f", OpenFlags::O_WRONLY | OpenFlags::O_CREAT),
        Err(FsError::InvalidArgument)
    );
    // 显式 exclusive/append/truncate 都可以
    let fd = vfs
        .open("fat:/f", OpenFlags::O_WRONLY | OpenFlags::O_CREAT | OpenFlags::O_EXCL)
        .unwrap();
    vfs.close(fd).unwrap();
    let fd = vfs
        .open(
            "fat:/g",
            OpenFlags::O_WRONLY | OpenFlags::O_CREAT | OpenFlags::O_APPEND,
        )
        .unwrap();
    vfs.close(fd).unwrap();
}

#[test]
fn test_exclusive_create_fails_on_existing() {
    let vfs = mount("fat");
    let fd = vfs
        .open("fat:/f", OpenFlags::O_WRONLY | OpenFlags::O_CREAT | OpenFlags::O_EXCL)
        .unwrap();
    vfs.close(fd).unwrap();
    assert_eq!(
        vfs.open("fat:/f", OpenFlags::O_WRONLY | OpenFlags::O_CREAT | OpenFlags::O_EXCL),
        Err(FsError::AlreadyExists)
    );
}

#[test]
fn test_open_missing_file_not_found() {
    let vfs = mount("fat");
    assert_eq!(
        vfs.open("fat:/missing", OpenFlags::O_RDONLY),
        Err(FsError::NotFound)
    );
}

#[test]
fn test_seek_normalizes_end_and_cur() {
    let vfs = mount("fat");
    let fd = vfs
        .open(
            "fat:/s",
            OpenFlags::O_RDWR | OpenFlags::O_CREAT | OpenFlags::O_TRUNC,
        )
        .unwrap();
    write_all(&vfs, fd, b"0123456789");

    assert_eq!(vfs.lseek(fd, -2, SeekWhence::End).unwrap(), 8);
    assert_eq!(vfs.lseek(fd, -3, SeekWhence::Cur).unwrap(), 5);
    assert_eq!(vfs.lseek(fd, 2, SeekWhence::Set).unwrap(), 2);
    assert_eq!(
        vfs.lseek(fd, -1, SeekWhence::Set),
        Err(FsError::InvalidArgument)
    );
    assert_eq!(
        vfs.lseek(fd, -11, SeekWhence::End),
        Err(FsError::InvalidArgument)
    );

    let mut b = [0u8; 1];
    vfs.read(fd, &mut b).unwrap();
    assert_eq!(b[0], b'2');
    vfs.close(fd).unwrap();
}

#[test]
fn test_ftruncate_grow_zero_fills_and_keeps_position() {
    let vfs = mount("fat");
    let fd = vfs
        .open(
            "fat:/t",
            OpenFlags::O_RDWR | OpenFlags::O_CREAT | OpenFlags::O_TRUNC,
        )
        .unwrap();
    write_all(&vfs, fd, b"0123456789");
    vfs.lseek(fd, 4, SeekWhence::Set).unwrap();

    // 跨一个 128 字节零块的增长
    vfs.ftruncate(fd, 300).unwrap();
    assert_eq!(vfs.lseek(fd, 0, SeekWhence::Cur).unwrap(), 4);
    assert_eq!(vfs.stat("fat:/t").unwrap().size, 300);

    let data = read_all(&vfs, fd, 296);
    assert_eq!(&data[..6], b"456789");
    assert!(data[6..].iter().all(|&b| b == 0));
    assert_eq!(data.len(), 296);
    vfs.close(fd).unwrap();
}

#[test]
fn test_ftruncate_shrink_discards_and_keeps_position() {
    let vfs = mount("fat");
    let fd = vfs
        .open(
            "fat:/t",
            OpenFlags::O_RDWR | OpenFlags::O_CREAT | OpenFlags::O_TRUNC,
        )
        .unwrap();
    write_all(&vfs, fd, b"0123456789");
    vfs.lseek(fd, 2, SeekWhence::Set).unwrap();

    vfs.ftruncate(fd, 3).unwrap();
    assert_eq!(vfs.lseek(fd, 0, SeekWhence::Cur).unwrap(), 2);
    assert_eq!(vfs.stat("fat:/t").unwrap().size, 3);

    let mut buf = [0u8; 8];
    assert_eq!(vfs.read(fd, &mut buf).unwrap(), 1);
    assert_eq!(buf[0], b'2');
    vfs.close(fd).unwrap();
}

#[test]
fn test_truncate_by_path() {
    let vfs = mount("fat");
    let fd = vfs
        .open(
            "fat:/t",
            OpenFlags::O_WRONLY | OpenFlags::O_CREAT | OpenFlags::O_TRUNC,
        )
        .unwrap();
    write_all(&vfs, fd, b"hello world");
    vfs.close(fd).unwrap();

    vfs.truncate("fat:/t", 5).unwrap();
    assert_eq!(vfs.stat("fat:/t").unwrap().size, 5);
}

#[test]
fn test_append_writes_at_end() {
    let vfs = mount("fat");
    let fd = vfs
        .open(
            "fat:/log",
            OpenFlags::O_WRONLY | OpenFlags::O_CREAT | OpenFlags::O_TRUNC,
        )
        .unwrap();
    write_all(&vfs, fd, b"first");
    vfs.close(fd).unwrap();

    let fd = vfs
        .open("fat:/log", OpenFlags::O_WRONLY | OpenFlags::O_APPEND)
        .unwrap();
    write_all(&vfs, fd, b"+more");
    vfs.close(fd).unwrap();

    let fd = vfs.open("fat:/log", OpenFlags::O_RDONLY).unwrap();
    assert_eq!(read_all(&vfs, fd, 10), b"first+more");
    vfs.close(fd).unwrap();
}

#[test]
fn test_stat_reports_kind_and_size() {
    let vfs = mount("fat");
    vfs.mkdir("fat:/sub", vfs::FileMode::empty()).unwrap();
    let fd = vfs
        .open(
            "fat:/sub/file",
            OpenFlags::O_WRONLY | OpenFlags::O_CREAT | OpenFlags::O_TRUNC,
        )
        .unwrap();
    write_all(&vfs, fd, b"abc");
    vfs.close(fd).unwrap();

    let st = vfs.stat("fat:/sub/file").unwrap();
    assert!(st.mode.is_file());
    assert_eq!(st.size, 3);
    assert_eq!(st.atime, st.mtime);

    let st = vfs.stat("fat:/sub").unwrap();
    assert!(st.mode.is_dir());

    assert_eq!(vfs.lstat("fat:/sub/file").unwrap().size, 3);
    assert_eq!(vfs.stat("fat:/none"), Err(FsError::NotFound));
}

#[test]
fn test_fstat_matches_stat() {
    let vfs = mount("fat");
    let fd = vfs
        .open(
            "fat:/f",
            OpenFlags::O_RDWR | OpenFlags::O_CREAT | OpenFlags::O_TRUNC,
        )
        .unwrap();
    write_all(&vfs, fd, b"xyz");
    let st = vfs.fstat(fd).unwrap();
    assert!(st.mode.is_file());
    assert_eq!(st.size, 3);
    vfs.close(fd).unwrap();
}

#[test]
fn test_mkdir_existing_fails() {
    let vfs = mount("fat");
    vfs.mkdir("fat:/d", vfs::FileMode::empty()).unwrap();
    assert_eq!(
        vfs.mkdir("fat:/d", vfs::FileMode::empty()),
        Err(FsError::AlreadyExists)
    );
}

#[test]
fn test_unlink_and_rmdir() {
    let vfs = mount("fat");
    vfs.mkdir("fat:/d", vfs::FileMode::empty()).unwrap();
    let fd = vfs
        .open(
            "fat:/d/f",
            OpenFlags::O_WRONLY | OpenFlags::O_CREAT | OpenFlags::O_TRUNC,
        )
        .unwrap();
    vfs.close(fd).unwrap();

    vfs.unlink("fat:/d/f").unwrap();
    assert_eq!(vfs.stat("fat:/d/f"), Err(FsError::NotFound));

    vfs.rmdir("fat:/d").unwrap();
    assert_eq!(vfs.stat("fat:/d"), Err(FsError::NotFound));
    assert_eq!(vfs.rmdir("fat:/d"), Err(FsError::NotFound));
}

#[test]
fn test_rmdir_on_file_is_not_directory() {
    let vfs = mount("fat");
    let fd = vfs
        .open(
            "fat:/f",
            OpenFlags::O_WRONLY | OpenFlags::O_CREAT | OpenFlags::O_TRUNC,
        )
        .unwrap();
    vfs.close(fd).unwrap();
    assert_eq!(vfs.rmdir("fat:/f"), Err(FsError::NotDirectory));
}

#[test]
fn test_rename_moves_file() {
    let vfs = mount("fat");
    vfs.mkdir("fat:/d", vfs::FileMode::empty()).unwrap();
    let fd = vfs
        .open(
            "fat:/a",
            OpenFlags::O_WRONLY | OpenFlags::O_CREAT | OpenFlags::O_TRUNC,
        )
        .unwrap();
    write_all(&vfs, fd, b"data");
    vfs.close(fd).unwrap();

    vfs.rename("fat:/a", "fat:/d/b").unwrap();
    assert_eq!(vfs.stat("fat:/a"), Err(FsError::NotFound));
    assert_eq!(vfs.stat("fat:/d/b").unwrap().size, 4);
}

#[test]
fn test_link_has_no_hard_links() {
    let vfs = mount("fat");
    let fd = vfs
        .open(
            "fat:/a",
            OpenFlags::O_WRONLY | OpenFlags::O_CREAT | OpenFlags::O_TRUNC,
        )
        .unwrap();
    vfs.close(fd).unwrap();
    assert_eq!(vfs.link("fat:/a", "fat:/b"), Err(FsError::TooManyLinks));
}

#[test]
fn test_chdir_and_relative_paths() {
    let vfs = mount("fat");
    vfs.mkdir("fat:/sub", vfs::FileMode::empty()).unwrap();
    vfs.chdir("fat:/sub").unwrap();
    assert_eq!(vfs.getcwd().unwrap(), "fat:/sub");

    let fd = vfs
        .open(
            "inner",
            OpenFlags::O_WRONLY | OpenFlags::O_CREAT | OpenFlags::O_TRUNC,
        )
        .unwrap();
    write_all(&vfs, fd, b"rel");
    vfs.close(fd).unwrap();
    assert_eq!(vfs.stat("fat:/sub/inner").unwrap().size, 3);

    vfs.chdir("..").unwrap();
    assert_eq!(vfs.getcwd().unwrap(), "fat:/");
    assert_eq!(vfs.chdir("fat:/nope"), Err(FsError::NotFound));
}

#[test]
fn test_directory_enumeration() {
    let vfs = mount("fat");
    vfs.mkdir("fat:/d", vfs::FileMode::empty()).unwrap();
    for name in ["one", "two", "three"] {
        let fd = vfs
            .open(
                &format!("fat:/d/{}", name),
                OpenFlags::O_WRONLY | OpenFlags::O_CREAT | OpenFlags::O_TRUNC,
            )
            .unwrap();
        vfs.close(fd).unwrap();
    }

    let mut dir = vfs.opendir("fat:/d").unwrap();
    let mut names = Vec::new();
    while let Some(entry) = vfs.readdir(&mut dir).unwrap() {
        names.push(entry.name);
    }
    for name in ["one", "two", "three"] {
        assert!(names.iter().any(|n| n.eq_ignore_ascii_case(name)));
    }

    vfs.rewinddir(&mut dir).unwrap();
    assert_eq!(dir.position(), 0);
    assert!(vfs.readdir(&mut dir).unwrap().is_some());
    vfs.closedir(dir).unwrap();
}

#[test]
fn test_statvfs_reports_geometry() {
    let vfs = mount("fat");
    let sv = vfs.statvfs("fat:/").unwrap();
    assert!(sv.bsize > 0);
    assert!(sv.blocks > 0);
    assert!(sv.bfree <= sv.blocks);
    assert_eq!(sv.flag & uapi::fs::ST_RDONLY, 0);
    assert_eq!(sv.namemax, 255);
}

#[test]
fn test_fsync_succeeds() {
    let vfs = mount("fat");
    let fd = vfs
        .open(
            "fat:/f",
            OpenFlags::O_WRONLY | OpenFlags::O_CREAT | OpenFlags::O_TRUNC,
        )
        .unwrap();
    write_all(&vfs, fd, b"sync me");
    vfs.fsync(fd).unwrap();
    vfs.close(fd).unwrap();
}
