use std::sync::Arc;

use test_support::mock::device::MockDevice;
use vfs::{DeviceTable, FsError, MAX_DEVICES, RESERVED_DEVICES};

#[test]
fn test_register_allocates_from_slot_three() {
    let table = DeviceTable::new();
    let idx = table.register(Arc::new(MockDevice::posix("fat"))).unwrap();
    assert_eq!(idx, RESERVED_DEVICES);
}

#[test]
fn test_register_rejects_empty_name() {
    let table = DeviceTable::new();
    assert_eq!(
        table.register(Arc::new(MockDevice::posix(""))),
        Err(FsError::InvalidArgument)
    );
}

#[test]
fn test_first_registration_becomes_default() {
    let table = DeviceTable::new();
    assert_eq!(table.get_default(), None);
    let idx = table.register(Arc::new(MockDevice::posix("fat"))).unwrap();
    assert_eq!(table.get_default(), Some(idx));
    let other = table.register(Arc::new(MockDevice::posix("rom"))).unwrap();
    assert_ne!(table.get_default(), Some(other));
}

#[test]
fn test_find_matches_exact_prefix_only() {
    let table = DeviceTable::new();
    let fat = table.register(Arc::new(MockDevice::posix("fat"))).unwrap();
    let fatx = table.register(Arc::new(MockDevice::posix("fatx"))).unwrap();
    assert_eq!(table.find("fat:/dir/file"), Ok(fat));
    assert_eq!(table.find("fatx:/dir/file"), Ok(fatx));
    assert_eq!(table.find("fa:/dir/file"), Err(FsError::NoDevice));
}

#[test]
fn test_find_without_prefix_uses_default() {
    let table = DeviceTable::new();
    let fat = table.register(Arc::new(MockDevice::posix("fat"))).unwrap();
    let rom = table.register(Arc::new(MockDevice::posix("rom"))).unwrap();
    assert_eq!(table.find("plain/file"), Ok(fat));
    table.set_default(rom).unwrap();
    assert_eq!(table.find("plain/file"), Ok(rom));
}

#[test]
fn test_same_name_reuses_slot() {
    let table = DeviceTable::new();
    let first = table.register(Arc::new(MockDevice::posix("fat"))).unwrap();
    let _other = table.register(Arc::new(MockDevice::posix("rom"))).unwrap();
    let again = table.register(Arc::new(MockDevice::posix("fat"))).unwrap();
    assert_eq!(first, again);
}

#[test]
fn test_full_table_fails_without_clobbering() {
    let table = DeviceTable::new();
    for i in 0..(MAX_DEVICES - RESERVED_DEVICES) {
        table
            .register(Arc::new(MockDevice::posix(&format!("dev{}", i))))
            .unwrap();
    }
    assert_eq!(
        table.register(Arc::new(MockDevice::posix("extra"))),
        Err(FsError::NoSpace)
    );
    for i in 0..(MAX_DEVICES - RESERVED_DEVICES) {
        let idx = table.find(&format!("dev{}:/x", i)).unwrap();
        assert_eq!(table.get(idx).unwrap().name(), format!("dev{}", i));
    }
}

#[test]
fn test_unregister_clears_default() {
    let table = DeviceTable::new();
    table.register(Arc::new(MockDevice::posix("fat"))).unwrap();
    assert!(table.get_default().is_some());
    table.unregister("fat").unwrap();
    assert_eq!(table.get_default(), None);
    assert_eq!(table.unregister("fat"), Err(FsError::NotFound));
    assert_eq!(table.find("fat:/x"), Err(FsError::NoDevice));
}

#[test]
fn test_set_default_validates_slot() {
    let table = DeviceTable::new();
    assert_eq!(table.set_default(5), Err(FsError::InvalidArgument));
    assert_eq!(table.set_default(MAX_DEVICES), Err(FsError::InvalidArgument));
    let idx = table.register(Arc::new(MockDevice::posix("fat"))).unwrap();
    assert_eq!(table.set_default(idx), Ok(()));
}

#[test]
fn test_get_out_of_range_is_none() {
    let table = DeviceTable::new();
    assert!(table.get(MAX_DEVICES).is_none());
    assert!(table.get(7).is_none());
    assert!(table.get(0).is_some());
}
