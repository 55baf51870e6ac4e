use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use broadcast_bot::database::{connection::DatabaseManager, models::*};
use broadcast_bot::services::broadcast::{BroadcastError, BroadcastService, TriggeredBy};
use broadcast_bot::services::transport::{
    Attachment, BroadcastContent, ContentError, DeliveryFailure, MessageTransport,
};
use tempfile::{tempdir, TempDir};
use tokio_test::assert_ok;

/// Records every send and fails the chats it was told to fail.
#[derive(Default)]
struct ScriptedTransport {
    failing: HashSet<i64>,
    send_time: Duration,
    sent: Mutex<Vec<(i64, Instant)>>,
    contents: Mutex<Vec<BroadcastContent>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    fn failing(chat_ids: &[i64]) -> Self {
        Self {
            failing: chat_ids.iter().copied().collect(),
            ..Default::default()
        }
    }

    fn sent_chats(&self) -> Vec<i64> {
        self.sent.lock().unwrap().iter().map(|(chat, _)| *chat).collect()
    }

    fn send_instants(&self) -> Vec<Instant> {
        self.sent.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }
}

#[async_trait]
impl MessageTransport for ScriptedTransport {
    async fn send(&self, chat_id: i64, content: &BroadcastContent) -> Result<(), DeliveryFailure> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        self.sent.lock().unwrap().push((chat_id, Instant::now()));
        self.contents.lock().unwrap().push(content.clone());
        if !self.send_time.is_zero() {
            tokio::time::sleep(self.send_time).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&chat_id) {
            Err(DeliveryFailure::Blocked)
        } else {
            Ok(())
        }
    }
}

async fn setup_test_db() -> Result<(Arc<DatabaseManager>, TempDir)> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().join("test.db");
    let database_url = format!("sqlite:{}", db_path.display());

    let db_manager = DatabaseManager::new(&database_url).await?;
    db_manager.run_migrations().await?;

    Ok((Arc::new(db_manager), temp_dir))
}

async fn register_groups(db: &DatabaseManager, groups: &[(i64, &str)]) -> Result<Vec<Target>> {
    let mut targets = Vec::new();
    for (chat_id, name) in groups {
        targets.push(Target::register(&db.pool, *chat_id, name, TargetKind::Group).await?);
    }
    Ok(targets)
}

fn service(db: &Arc<DatabaseManager>, transport: &Arc<ScriptedTransport>, delay: Duration) -> BroadcastService {
    BroadcastService::new(db.clone(), transport.clone(), delay)
}

#[tokio::test]
async fn test_partial_failure_is_counted_and_recorded() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let message = MessageTemplate::create(&db.pool, NewTemplate::text("Promo", "Hello")).await?;
    let targets = register_groups(&db, &[(-1001, "G1"), (-1002, "G2"), (-1003, "G3")]).await?;

    let transport = Arc::new(ScriptedTransport::failing(&[-1002]));
    let broadcaster = service(&db, &transport, Duration::ZERO);

    let outcome = broadcaster
        .run_broadcast(&message, &targets, &TriggeredBy::Admin("admin1".to_string()))
        .await?;

    assert_eq!((outcome.total, outcome.succeeded, outcome.failed), (3, 2, 1));
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].chat_id, -1002);
    assert_eq!(outcome.failures[0].name, "G2");
    assert_eq!(outcome.failures[0].reason, DeliveryFailure::Blocked);

    // The failing target did not stop delivery to the one after it.
    assert_eq!(transport.sent_chats(), vec![-1001, -1002, -1003]);

    let history = BroadcastRecord::recent(&db.pool, 10).await?;
    assert_eq!(history.len(), 1);
    let record = &history[0];
    assert_eq!(record.id, outcome.record_id);
    assert_eq!(record.message_id, message.id);
    assert_eq!(record.message_title, "Promo");
    assert_eq!((record.total, record.succeeded, record.failed), (3, 2, 1));
    assert_eq!(record.executed_by, "admin1");

    Ok(())
}

#[tokio::test]
async fn test_all_targets_succeed() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let message = MessageTemplate::create(&db.pool, NewTemplate::text("Hello", "Hi all")).await?;
    let targets = register_groups(&db, &[(-1001, "G1"), (-1002, "G2")]).await?;

    let transport = Arc::new(ScriptedTransport::default());
    let broadcaster = service(&db, &transport, Duration::ZERO);

    let outcome = assert_ok!(
        broadcaster
            .run_broadcast(&message, &targets, &TriggeredBy::Scheduled)
            .await
    );

    assert_eq!((outcome.total, outcome.succeeded, outcome.failed), (2, 2, 0));
    assert!(outcome.failures.is_empty());

    let contents = transport.contents.lock().unwrap().clone();
    assert!(contents.iter().all(|c| c.text == "Hi all" && c.attachment == Attachment::None));

    let record = BroadcastRecord::find_by_id(&db.pool, outcome.record_id).await?.expect("ledger row");
    assert_eq!(record.executed_by, "scheduled");

    Ok(())
}

#[tokio::test]
async fn test_every_target_failing_still_completes() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let message = MessageTemplate::create(&db.pool, NewTemplate::text("Hello", "Hi")).await?;
    let targets = register_groups(&db, &[(-1001, "G1"), (-1002, "G2"), (-1003, "G3")]).await?;

    let transport = Arc::new(ScriptedTransport::failing(&[-1001, -1002, -1003]));
    let broadcaster = service(&db, &transport, Duration::ZERO);

    let outcome = broadcaster
        .run_broadcast(&message, &targets, &TriggeredBy::Admin("@admin".to_string()))
        .await?;

    assert_eq!((outcome.total, outcome.succeeded, outcome.failed), (3, 0, 3));
    assert_eq!(transport.sent_chats().len(), 3);
    assert_eq!(BroadcastRecord::stats(&db.pool).await?.total_failed, 3);

    Ok(())
}

#[tokio::test]
async fn test_empty_target_list_records_zero_run() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let message = MessageTemplate::create(&db.pool, NewTemplate::text("Hello", "Hi")).await?;

    let transport = Arc::new(ScriptedTransport::default());
    let broadcaster = service(&db, &transport, Duration::from_millis(50));

    let outcome = broadcaster
        .run_broadcast(&message, &[], &TriggeredBy::Admin("@admin".to_string()))
        .await?;

    assert_eq!((outcome.total, outcome.succeeded, outcome.failed), (0, 0, 0));
    assert!(transport.sent_chats().is_empty());

    let record = BroadcastRecord::find_by_id(&db.pool, outcome.record_id).await?.expect("ledger row");
    assert_eq!((record.total, record.succeeded, record.failed), (0, 0, 0));

    Ok(())
}

#[tokio::test]
async fn test_sends_are_spaced_by_delay() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let message = MessageTemplate::create(&db.pool, NewTemplate::text("Hello", "Hi")).await?;
    let targets = register_groups(&db, &[(-1001, "G1"), (-1002, "G2"), (-1003, "G3")]).await?;

    let delay = Duration::from_millis(40);
    let transport = Arc::new(ScriptedTransport::default());
    let broadcaster = service(&db, &transport, delay);

    broadcaster
        .run_broadcast(&message, &targets, &TriggeredBy::Scheduled)
        .await?;

    let instants = transport.send_instants();
    assert_eq!(instants.len(), 3);
    for pair in instants.windows(2) {
        assert!(pair[1].duration_since(pair[0]) >= delay);
    }

    Ok(())
}

#[tokio::test]
async fn test_concurrent_runs_never_overlap() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let message = MessageTemplate::create(&db.pool, NewTemplate::text("Hello", "Hi")).await?;
    let targets = register_groups(&db, &[(-1001, "G1"), (-1002, "G2"), (-1003, "G3")]).await?;

    let transport = Arc::new(ScriptedTransport {
        send_time: Duration::from_millis(10),
        ..Default::default()
    });
    let broadcaster = Arc::new(service(&db, &transport, Duration::from_millis(5)));

    let manual = {
        let broadcaster = broadcaster.clone();
        let message = message.clone();
        let targets = targets.clone();
        tokio::spawn(async move {
            broadcaster
                .run_broadcast(&message, &targets, &TriggeredBy::Admin("@admin".to_string()))
                .await
        })
    };
    let scheduled = {
        let broadcaster = broadcaster.clone();
        let message = message.clone();
        let targets = targets.clone();
        tokio::spawn(async move {
            broadcaster
                .run_broadcast(&message, &targets, &TriggeredBy::Scheduled)
                .await
        })
    };

    let (manual, scheduled) = tokio::join!(manual, scheduled);
    assert_eq!(manual??.total, 3);
    assert_eq!(scheduled??.total, 3);

    assert_eq!(transport.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(BroadcastRecord::stats(&db.pool).await?.total_broadcasts, 2);

    // One run finishes before the other starts.
    let chats = transport.sent_chats();
    assert_eq!(chats, vec![-1001, -1002, -1003, -1001, -1002, -1003]);

    Ok(())
}

#[tokio::test]
async fn test_broadcast_message_uses_current_registry() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let message = MessageTemplate::create(&db.pool, NewTemplate::text("Promo", "Big sale")).await?;
    register_groups(&db, &[(-1001, "G1"), (-1002, "G2"), (-1003, "G3")]).await?;
    Target::delete_by_chat_id(&db.pool, -1002).await?;

    let transport = Arc::new(ScriptedTransport::default());
    let broadcaster = service(&db, &transport, Duration::ZERO);

    let outcome = broadcaster
        .broadcast_message(message.id, &TriggeredBy::Admin("@admin".to_string()))
        .await?;

    assert_eq!(outcome.total, 2);
    assert_eq!(transport.sent_chats(), vec![-1001, -1003]);

    Ok(())
}

#[tokio::test]
async fn test_unknown_message_sends_nothing() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    register_groups(&db, &[(-1001, "G1")]).await?;

    let transport = Arc::new(ScriptedTransport::default());
    let broadcaster = service(&db, &transport, Duration::ZERO);

    let result = broadcaster
        .broadcast_message(404, &TriggeredBy::Admin("@admin".to_string()))
        .await;

    assert!(matches!(result, Err(BroadcastError::MessageNotFound(404))));
    assert!(transport.sent_chats().is_empty());
    assert!(BroadcastRecord::recent(&db.pool, 10).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_media_message_without_file_is_rejected() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let new = NewTemplate {
        title: "Photo".to_string(),
        content: "caption".to_string(),
        kind: MessageKind::Photo,
        media_file_id: None,
        buttons: None,
    };
    let message = MessageTemplate::create(&db.pool, new).await?;
    let targets = register_groups(&db, &[(-1001, "G1")]).await?;

    let transport = Arc::new(ScriptedTransport::default());
    let broadcaster = service(&db, &transport, Duration::ZERO);

    let result = broadcaster
        .run_broadcast(&message, &targets, &TriggeredBy::Scheduled)
        .await;

    assert!(matches!(
        result,
        Err(BroadcastError::InvalidMessage {
            source: ContentError::MissingMedia(MessageKind::Photo),
            ..
        })
    ));
    assert!(transport.sent_chats().is_empty());
    assert!(BroadcastRecord::recent(&db.pool, 10).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_buttons_reach_the_transport() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let new = NewTemplate {
        title: "Links".to_string(),
        content: "Visit us".to_string(),
        kind: MessageKind::Photo,
        media_file_id: Some("file-1".to_string()),
        buttons: Some(vec![vec![ButtonSpec {
            text: "Shop".to_string(),
            url: "https://example.com/shop".to_string(),
        }]]),
    };
    let message = MessageTemplate::create(&db.pool, new).await?;
    let targets = register_groups(&db, &[(-1001, "G1")]).await?;

    let transport = Arc::new(ScriptedTransport::default());
    let broadcaster = service(&db, &transport, Duration::ZERO);
    broadcaster
        .run_broadcast(&message, &targets, &TriggeredBy::Scheduled)
        .await?;

    let contents = transport.contents.lock().unwrap().clone();
    assert_eq!(contents.len(), 1);
    assert_eq!(contents[0].attachment, Attachment::Photo("file-1".to_string()));
    let keyboard = contents[0].keyboard.as_ref().expect("keyboard attached");
    assert_eq!(keyboard.inline_keyboard.len(), 1);
    assert_eq!(keyboard.inline_keyboard[0][0].text, "Shop");

    Ok(())
}

#[tokio::test]
async fn test_preview_skips_the_ledger() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let message = MessageTemplate::create(&db.pool, NewTemplate::text("Promo", "Big sale")).await?;

    let transport = Arc::new(ScriptedTransport::failing(&[-5]));
    let broadcaster = service(&db, &transport, Duration::ZERO);

    assert_ok!(broadcaster.send_preview(message.id, 77).await);
    assert!(matches!(
        broadcaster.send_preview(message.id, -5).await,
        Err(BroadcastError::PreviewFailed(DeliveryFailure::Blocked))
    ));

    assert_eq!(transport.sent_chats(), vec![77, -5]);
    assert!(BroadcastRecord::recent(&db.pool, 10).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_media_caption_over_limit_is_rejected_before_sending() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let new = NewTemplate {
        title: "Launch".to_string(),
        content: "x".repeat(2000),
        kind: MessageKind::Video,
        media_file_id: Some("video-1".to_string()),
        buttons: None,
    };
    let message = MessageTemplate::create(&db.pool, new).await?;
    let targets = register_groups(&db, &[(-1001, "G1"), (-1002, "G2")]).await?;

    let transport = Arc::new(ScriptedTransport::default());
    let broadcaster = service(&db, &transport, Duration::ZERO);

    let result = broadcaster
        .run_broadcast(&message, &targets, &TriggeredBy::Scheduled)
        .await;

    assert!(matches!(
        result,
        Err(BroadcastError::InvalidMessage {
            source: ContentError::CaptionTooLong { length: 2000, .. },
            ..
        })
    ));
    assert!(transport.sent_chats().is_empty());
    assert!(BroadcastRecord::recent(&db.pool, 10).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_removing_a_target_keeps_past_records() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let message = MessageTemplate::create(&db.pool, NewTemplate::text("Promo", "Hello")).await?;
    register_groups(&db, &[(-1001, "G1"), (-1002, "G2"), (-1003, "G3")]).await?;

    let transport = Arc::new(ScriptedTransport::failing(&[-1002]));
    let broadcaster = service(&db, &transport, Duration::ZERO);
    let admin = TriggeredBy::Admin("admin1".to_string());

    let first = broadcaster.broadcast_message(message.id, &admin).await?;
    assert!(Target::delete_by_chat_id(&db.pool, -1002).await?);

    let record = BroadcastRecord::find_by_id(&db.pool, first.record_id).await?.expect("ledger row");
    assert_eq!((record.total, record.succeeded, record.failed), (3, 2, 1));
    assert_eq!(record.executed_by, "admin1");

    let second = broadcaster.broadcast_message(message.id, &admin).await?;
    assert_eq!((second.total, second.succeeded, second.failed), (2, 2, 0));
    assert_eq!(transport.sent_chats(), vec![-1001, -1002, -1003, -1001, -1003]);

    Ok(())
}

#[tokio::test]
async fn test_ledger_write_failure_keeps_deliveries() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let message = MessageTemplate::create(&db.pool, NewTemplate::text("Promo", "Hello")).await?;
    let targets = register_groups(&db, &[(-1001, "G1"), (-1002, "G2"), (-1003, "G3")]).await?;

    // The ledger is only written after the last send, so the run gets through
    // every delivery before hitting the missing table.
    sqlx::query("DROP TABLE broadcast_history").execute(&db.pool).await?;

    let transport = Arc::new(ScriptedTransport::default());
    let broadcaster = service(&db, &transport, Duration::ZERO);

    let result = broadcaster
        .run_broadcast(&message, &targets, &TriggeredBy::Admin("admin1".to_string()))
        .await;

    assert!(matches!(result, Err(BroadcastError::Store(_))));
    assert_eq!(transport.sent_chats(), vec![-1001, -1002, -1003]);

    Ok(())
}
