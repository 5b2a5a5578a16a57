/// File-backed topology tests
///
/// Several wranglers, each with its own FileTopo over one shared directory,
/// stand in for separate processes.
/// Run with: cargo test --test file_topo_tests
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use topowrangler::{
    ActionNode, ActionState, FileTopo, FileTopoConfig, InterruptSignal, KeyRange, Shard, ShardKey,
    TabletAlias, TabletType, TopoError, TopoServer, Wrangler, WranglerConfig,
};

fn file_topo(dir: &TempDir) -> Arc<FileTopo> {
    Arc::new(
        FileTopo::new(FileTopoConfig::new(dir.path()).poll_interval(Duration::from_millis(2)))
            .unwrap(),
    )
}

fn wrangler(topo: Arc<FileTopo>, lock_timeout: Duration) -> Wrangler {
    Wrangler::new(topo, WranglerConfig::new().lock_timeout(lock_timeout)).unwrap()
}

#[tokio::test]
async fn test_set_served_types_on_disk() {
    let dir = TempDir::new().unwrap();
    let topo = file_topo(&dir);
    let key = ShardKey::new("ks1", "0");
    let original = Shard {
        master_alias: Some(TabletAlias::new("zone1", 1)),
        served_types: vec![TabletType::Master],
        key_range: KeyRange::new("", ""),
        source_shards: Vec::new(),
    };
    topo.create_shard(&key, original.clone()).await.unwrap();

    let wr = wrangler(topo.clone(), Duration::from_secs(1));
    wr.set_shard_served_types("ks1", "0", vec![TabletType::Master, TabletType::Replica])
        .await
        .unwrap();

    // A fresh instance sees what the first one wrote.
    let reader = file_topo(&dir);
    let info = reader.get_shard(&key).await.unwrap();
    assert_eq!(info.shard.served_types, vec![TabletType::Master, TabletType::Replica]);
    assert_eq!(info.shard.master_alias, original.master_alias);
    assert_eq!(info.shard.key_range, original.key_range);

    let log = reader.shard_action_log(&key).await.unwrap();
    assert_eq!(log.len(), 1);
    let node = ActionNode::from_json(&log[0]).unwrap();
    assert_eq!(node.state(), ActionState::Done);
    assert_eq!(node.error(), "");
    assert_eq!(reader.shard_lock_contents(&key).await.unwrap(), None);
}

#[tokio::test]
async fn test_missing_shard_leaves_failed_action() {
    let dir = TempDir::new().unwrap();
    let wr = wrangler(file_topo(&dir), Duration::from_secs(1));

    let err = wr
        .set_shard_served_types("ks1", "0", vec![TabletType::Master])
        .await
        .unwrap_err();
    assert_eq!(err, TopoError::RecordNotFound("ks1/0".into()));

    let log = file_topo(&dir)
        .shard_action_log(&ShardKey::new("ks1", "0"))
        .await
        .unwrap();
    let node = ActionNode::from_json(&log[0]).unwrap();
    assert_eq!(node.state(), ActionState::Failed);
    assert_eq!(node.error(), "Record not found: ks1/0");
}

#[tokio::test]
async fn test_lock_held_by_other_instance_times_out() {
    let dir = TempDir::new().unwrap();
    let key = ShardKey::new("ks1", "0");
    let holder = file_topo(&dir);
    holder.create_shard(&key, Shard::default()).await.unwrap();
    let held = holder
        .lock_shard_for_action(&key, "busy".into(), Duration::from_secs(1), &InterruptSignal::new())
        .await
        .unwrap();

    let wr = wrangler(file_topo(&dir), Duration::from_millis(40));
    let err = wr
        .set_shard_served_types("ks1", "0", vec![TabletType::Replica])
        .await
        .unwrap_err();
    assert!(matches!(err, TopoError::LockTimeout(_)));
    assert!(holder.get_shard(&key).await.unwrap().shard.served_types.is_empty());

    holder
        .unlock_shard_for_action(&key, &held, "done".into())
        .await
        .unwrap();
    wr.set_shard_served_types("ks1", "0", vec![TabletType::Replica])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_wranglers_sharing_a_directory_take_turns() {
    let dir = TempDir::new().unwrap();
    let key = ShardKey::new("ks1", "0");
    file_topo(&dir).create_shard(&key, Shard::default()).await.unwrap();

    let handles = TabletType::ALL.into_iter().map(|tablet_type| {
        let topo = file_topo(&dir);
        let wr = wrangler(topo.clone(), Duration::from_secs(10));
        let key = key.clone();
        tokio::spawn(async move {
            let mut node = ActionNode::set_shard_served_types(vec![tablet_type]);
            wr.run_guarded("ks1", "0", &mut node, || async {
                let mut info = topo.get_shard(&key).await?;
                tokio::time::sleep(Duration::from_millis(1)).await;
                info.shard.served_types.push(tablet_type);
                topo.update_shard(&info).await.map(|_| ())
            })
            .await
        })
    });

    for joined in join_all(handles).await {
        joined.unwrap().unwrap();
    }

    let reader = file_topo(&dir);
    let info = reader.get_shard(&key).await.unwrap();
    assert_eq!(info.shard.served_types.len(), TabletType::ALL.len());
    assert_eq!(info.version(), 1 + TabletType::ALL.len() as u64);

    let log = reader.shard_action_log(&key).await.unwrap();
    assert_eq!(log.len(), TabletType::ALL.len());
    for entry in log {
        assert_eq!(ActionNode::from_json(&entry).unwrap().state(), ActionState::Done);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_from_same_version_have_one_winner() {
    let dir = TempDir::new().unwrap();
    let first = file_topo(&dir);
    let second = file_topo(&dir);

    for round in 0..30 {
        let key = ShardKey::new("ks1", format!("{}", round));
        first
            .create_shard(&key, Shard::with_served_types(vec![TabletType::Master]))
            .await
            .unwrap();

        let mut a = first.get_shard(&key).await.unwrap();
        let mut b = a.clone();
        a.shard.served_types.push(TabletType::Replica);
        b.shard.served_types.push(TabletType::Rdonly);

        let (ta, tb) = (first.clone(), second.clone());
        let left = tokio::spawn(async move { ta.update_shard(&a).await });
        let right = tokio::spawn(async move { tb.update_shard(&b).await });
        let results = [left.await.unwrap(), right.await.unwrap()];

        let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1, "round {}: {:?}", round, results);
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(TopoError::Store(_)))),
            "round {}: {:?}",
            round,
            results
        );

        let stored = first.get_shard(&key).await.unwrap();
        assert_eq!(stored.version(), 2);
        assert_eq!(&stored, winners[0]);
    }
}
