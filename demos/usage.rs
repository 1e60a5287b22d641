use anyhow::{ensure, Result};
use snapkv::{Db, Options};
use tracing_subscriber::EnvFilter;

fn usage(db: &Db) -> Result<()> {
    db.put(b"key", b"value")?;
    ensure!(db.get(b"key", None)?.as_deref() == Some(&b"value"[..]));

    db.delete(b"key")?;
    ensure!(db.get(b"key", None)?.is_none(), "key still visible after delete");
    Ok(())
}

fn snapshot(db: &Db) -> Result<()> {
    db.put(b"key", b"1")?;
    db.put(b"aaaa", b"12341234")?;
    let snapshot = db.get_snapshot()?;
    for i in 2..=11 {
        db.put(b"key", i.to_string().as_bytes())?;
    }
    let value = db.get(b"key", Some(&snapshot))?;
    ensure!(value.as_deref() == Some(&b"1"[..]), "snapshot read {:?}", value);
    db.release_snapshot(&snapshot)?;
    Ok(())
}

fn snapshot_with_hole_seq(db: &Db) -> Result<()> {
    db.put(b"key11", b"val1")?;
    let snapshot1 = db.get_snapshot()?;
    db.put(b"key21", b"val2")?;
    let snapshot2 = db.get_snapshot()?;
    db.put(b"key11", b"val2")?;

    let value = db.get(b"key11", Some(&snapshot2))?;
    ensure!(value.as_deref() == Some(&b"val1"[..]), "snapshot2 read {:?}", value);
    let value = db.get(b"key21", Some(&snapshot1))?;
    ensure!(value.is_none(), "snapshot1 read {:?}", value);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let dir = tempfile::tempdir()?;
    let db = Db::open(Options::default_opt().work_dir(dir.path()))?;
    usage(&db)?;
    snapshot(&db)?;
    snapshot_with_hole_seq(&db)?;
    db.close()?;
    println!("all scenarios passed");
    Ok(())
}
