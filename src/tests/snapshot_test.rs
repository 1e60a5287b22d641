use bytes::Bytes;

use crate::{Db, Error, Options};

fn open_db() -> (tempfile::TempDir, Db) {
    let dir = tempfile::tempdir().unwrap();
    let db = Db::open(Options::default_opt().work_dir(dir.path())).unwrap();
    (dir, db)
}

#[test]
fn test_usage() {
    let (_dir, db) = open_db();
    db.put(b"key", b"value").unwrap();
    assert_eq!(db.get(b"key", None).unwrap(), Some(Bytes::from("value")));

    db.delete(b"key").unwrap();
    assert_eq!(db.get(b"key", None).unwrap(), None);
}

#[test]
fn test_snapshot() {
    let (_dir, db) = open_db();
    let mut val = 1;
    let mut write = |db: &Db| {
        db.put(b"key", val.to_string().as_bytes()).unwrap();
        val += 1;
    };

    write(&db);
    db.put(b"aaaa", b"12341234").unwrap();
    let snapshot = db.get_snapshot().unwrap();
    assert_eq!(db.get(b"key", Some(&snapshot)).unwrap(), Some(Bytes::from("1")));
    for _ in 0..10 {
        write(&db);
    }
    assert_eq!(db.get(b"key", Some(&snapshot)).unwrap(), Some(Bytes::from("1")));
    assert_eq!(db.get(b"key", None).unwrap(), Some(Bytes::from("11")));
    db.release_snapshot(&snapshot).unwrap();
}

#[test]
fn test_snapshot_with_hole_seq() {
    let (_dir, db) = open_db();
    let key1 = b"key11";
    let key2 = b"key21";

    db.put(key1, b"val1").unwrap();
    let snapshot1 = db.get_snapshot().unwrap();
    db.put(key2, b"val2").unwrap();
    let snapshot2 = db.get_snapshot().unwrap();
    db.put(key1, b"val2").unwrap();

    assert_eq!(db.get(key1, Some(&snapshot2)).unwrap(), Some(Bytes::from("val1")));
    assert_eq!(db.get(key2, Some(&snapshot2)).unwrap(), Some(Bytes::from("val2")));
    assert_eq!(db.get(key1, Some(&snapshot1)).unwrap(), Some(Bytes::from("val1")));
    assert_eq!(db.get(key2, Some(&snapshot1)).unwrap(), None);
    assert_eq!(db.get(key1, None).unwrap(), Some(Bytes::from("val2")));

    assert_eq!(db.oldest_snapshot(), Some(snapshot1.sequence()));
    db.release_snapshot(&snapshot1).unwrap();
    assert_eq!(db.oldest_snapshot(), Some(snapshot2.sequence()));
}

#[test]
fn test_snapshot_sees_deletes_in_order() {
    let (_dir, db) = open_db();
    db.put(b"k", b"v1").unwrap();
    let before = db.get_snapshot().unwrap();
    db.delete(b"k").unwrap();
    let deleted = db.get_snapshot().unwrap();
    db.put(b"k", b"v3").unwrap();

    assert_eq!(db.get(b"k", Some(&before)).unwrap(), Some(Bytes::from("v1")));
    assert_eq!(db.get(b"k", Some(&deleted)).unwrap(), None);
    assert_eq!(db.get(b"k", None).unwrap(), Some(Bytes::from("v3")));
}

#[test]
fn test_snapshot_of_empty_store() {
    let db = Db::open_in_memory(Options::default_opt());
    let empty = db.get_snapshot().unwrap();
    assert_eq!(empty.sequence(), 0);
    db.put(b"k", b"v").unwrap();
    assert_eq!(db.get(b"k", Some(&empty)).unwrap(), None);
}

#[test]
fn test_double_release() {
    let (_dir, db) = open_db();
    db.put(b"k", b"v").unwrap();
    let pinned = db.get_snapshot().unwrap();
    db.put(b"k", b"v2").unwrap();
    let snapshot = db.get_snapshot().unwrap();

    db.release_snapshot(&snapshot).unwrap();
    db.release_snapshot(&snapshot).unwrap();
    assert_eq!(db.live_snapshots(), 1);
    assert_eq!(db.oldest_snapshot(), Some(pinned.sequence()));

    let err = db.get(b"k", Some(&snapshot)).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)), "{:?}", err);
    assert_eq!(db.get(b"k", Some(&pinned)).unwrap(), Some(Bytes::from("v")));
}

#[test]
fn test_shared_snapshot_sequence() {
    let db = Db::open_in_memory(Options::default_opt());
    db.put(b"k", b"v").unwrap();
    let s1 = db.get_snapshot().unwrap();
    let s2 = db.get_snapshot().unwrap();
    assert_eq!(s1.sequence(), s2.sequence());
    assert_eq!(db.live_snapshots(), 2);

    db.release_snapshot(&s1).unwrap();
    assert_eq!(db.oldest_snapshot(), Some(s2.sequence()));
    drop(s2);
    assert_eq!(db.oldest_snapshot(), None);
}

#[test]
fn test_foreign_snapshot() {
    let db1 = Db::open_in_memory(Options::default_opt());
    let db2 = Db::open_in_memory(Options::default_opt());
    let snapshot = db1.get_snapshot().unwrap();
    assert!(matches!(
        db2.get(b"k", Some(&snapshot)),
        Err(Error::InvalidArgument(_))
    ));
}
