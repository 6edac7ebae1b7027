use multistream::flags::{ItemFlags, TypeAndFlags};
use multistream::{ContainerDirectory, ContainerError, ErrorKind, ItemHeader};

fn entry(offset: u64, length: u64) -> ItemHeader {
    ItemHeader::new(offset, length, TypeAndFlags::pack(1, ItemFlags::empty()).unwrap())
}

#[test]
fn test_overlapping_append_rejected() {
    let mut dir = ContainerDirectory::new();
    assert_eq!(dir.append(entry(40, 30)).unwrap(), 0);

    let err = dir.append(entry(50, 20)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Overlap);
    assert!(matches!(
        err,
        ContainerError::Overlap { offset: 50, end: 70, existing: 0, existing_offset: 40, existing_end: 70 }
    ));
    assert_eq!(dir.len(), 1, "rejected entry is not stored");

    assert_eq!(dir.append(entry(70, 10)).unwrap(), 1);
}

#[test]
fn test_half_open_boundaries() {
    let mut dir = ContainerDirectory::new();
    dir.append(entry(100, 10)).unwrap();

    assert!(dir.append(entry(90, 10)).is_ok(), "ends exactly where the other starts");
    assert!(dir.append(entry(110, 5)).is_ok(), "starts exactly where the other ends");
    assert!(dir.append(entry(109, 1)).is_err());
    assert!(dir.append(entry(80, 200)).is_err(), "enclosing range");
    assert!(dir.append(entry(102, 2)).is_err(), "enclosed range");
}

#[test]
fn test_empty_ranges_never_overlap() {
    let mut dir = ContainerDirectory::new();
    dir.append(entry(0, 100)).unwrap();
    assert!(dir.append(entry(50, 0)).is_ok());
    assert!(dir.append(entry(50, 0)).is_ok());
}

#[test]
fn test_get_bounds() {
    let mut dir = ContainerDirectory::new();
    dir.append(entry(0, 10)).unwrap();
    dir.append(entry(10, 10)).unwrap();

    assert_eq!(dir.get(1).unwrap().offset, 10);
    let err = dir.get(2).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Index);
    assert!(matches!(err, ContainerError::IndexOutOfBounds { index: 2, count: 2 }));
}

#[test]
fn test_iteration_is_ordered_and_restartable() {
    let mut dir = ContainerDirectory::new();
    for offset in [30, 0, 60] {
        dir.append(entry(offset, 10)).unwrap();
    }
    let first: Vec<u64> = dir.iter().map(|h| h.offset).collect();
    let second: Vec<u64> = (&dir).into_iter().map(|h| h.offset).collect();
    assert_eq!(first, vec![30, 0, 60]);
    assert_eq!(first, second);
    assert_eq!(dir.end_offset(), 70);
}

#[test]
fn test_find_by_type() {
    let mut dir = ContainerDirectory::new();
    dir.append(ItemHeader::new(0, 4, TypeAndFlags::pack(7, ItemFlags::GZIPPED).unwrap())).unwrap();
    dir.append(ItemHeader::new(4, 4, TypeAndFlags::pack(8, ItemFlags::empty()).unwrap())).unwrap();
    dir.append(ItemHeader::new(8, 4, TypeAndFlags::pack(7, ItemFlags::empty()).unwrap())).unwrap();

    let hits: Vec<usize> = dir.find_by_type(7).map(|(i, _)| i).collect();
    assert_eq!(hits, vec![0, 2]);
}

#[test]
fn test_check_extent() {
    let mut dir = ContainerDirectory::new();
    dir.append(entry(0, 10)).unwrap();
    dir.append(entry(10, 20)).unwrap();

    assert!(dir.check_extent(30).is_ok());
    let err = dir.check_extent(29).unwrap_err();
    assert!(matches!(err, ContainerError::ExtentBeyondStream { offset: 10, length: 20, stream_len: 29 }));
}

#[test]
fn test_serialized_directory_mixes_versions() {
    let mut dir = ContainerDirectory::new();
    dir.append(entry(0, 10)).unwrap();
    dir.append(entry(10, 6_000_000_000)).unwrap();
    dir.append(entry(6_000_000_010, 1)).unwrap();

    let mut buf = Vec::new();
    let written = dir.write_to(&mut buf).unwrap();
    assert_eq!(written as usize, buf.len());
    assert_eq!(buf.len(), 4 + 15 + 19 + 15);

    let loaded = ContainerDirectory::read_from(&buf[..]).unwrap();
    assert_eq!(loaded.iter().copied().collect::<Vec<_>>(), dir.iter().copied().collect::<Vec<_>>());
}

#[test]
fn test_load_rejects_overlap_and_truncation() {
    let mut buf = Vec::new();
    buf.extend_from_slice(&2u32.to_le_bytes());
    entry(0, 10).write(&mut buf).unwrap();
    entry(5, 10).write(&mut buf).unwrap();
    assert_eq!(ContainerDirectory::read_from(&buf[..]).unwrap_err().kind(), ErrorKind::Overlap);

    let mut buf = Vec::new();
    buf.extend_from_slice(&3u32.to_le_bytes());
    entry(0, 10).write(&mut buf).unwrap();
    let err = ContainerDirectory::read_from(&buf[..]).unwrap_err();
    assert!(matches!(err, ContainerError::TruncatedHeader));
}
