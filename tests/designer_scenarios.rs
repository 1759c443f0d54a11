//! End-to-end editing sessions against the on-disk store and downloads.

use std::sync::Arc;

use flowdeck_core::traits::WorkflowStore;
use flowdeck_core::types::{NodeType, Position};
use flowdeck_designer::palette::drag_start;
use flowdeck_designer::{toolbar, Designer, Field, Intent, Outcome, PendingAction, Phase, Rect};
use flowdeck_store::{FileDownloads, SqliteStore};
use flowdeck_test_utils::{sample_catalog, FailingCatalog, StaticCatalog};

struct Session {
    _dir: tempfile::TempDir,
    store: Arc<SqliteStore>,
    downloads: Arc<FileDownloads>,
    designer: Designer,
}

async fn session(name: &str) -> Session {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::open(&dir.path().join("workflows.db")).unwrap());
    let downloads = Arc::new(FileDownloads::new(dir.path().join("downloads")));
    let mut designer = Designer::new(name, store.clone(), downloads.clone());
    designer
        .init(&StaticCatalog::new(sample_catalog()))
        .await
        .unwrap();
    Session {
        _dir: dir,
        store,
        downloads,
        designer,
    }
}

fn drop_agent(designer: &mut Designer, agent_id: &str, x: f64, y: f64) {
    let agent = designer
        .catalog()
        .agents
        .iter()
        .find(|a| a.agent_id == agent_id)
        .cloned()
        .unwrap();
    let transfer = drag_start(&agent).unwrap();
    designer
        .dispatch(Intent::Drop {
            transfer,
            client: Position::new(x, y),
        })
        .unwrap();
}

#[tokio::test]
async fn test_build_connect_save_and_reload() {
    let mut s = session("Ticket Triage").await;
    s.designer.canvas_mut().set_bounds(Rect::new(200.0, 40.0, 1200.0, 800.0));

    drop_agent(&mut s.designer, "a1", 500.0, 240.0);
    drop_agent(&mut s.designer, "a3", 900.0, 240.0);
    let ids: Vec<String> = s.designer.document().nodes.iter().map(|n| n.id.clone()).collect();
    assert_eq!(s.designer.document().nodes[0].position, Position::new(175.0, 160.0));

    s.designer
        .dispatch(Intent::ConnectNodes {
            source: ids[0].clone(),
            target: ids[1].clone(),
        })
        .unwrap();

    s.designer.dispatch(Intent::SelectNode(ids[1].clone())).unwrap();
    let intent = s
        .designer
        .property_panel()
        .unwrap()
        .edit(&Field::Tags, "notify, email ,");
    s.designer.dispatch(intent).unwrap();

    let (key, file) = match s.designer.dispatch(Intent::Save).unwrap() {
        Outcome::Saved { key, file } => (key, file),
        other => panic!("expected a save, got {:?}", other),
    };
    assert_eq!(file, "Ticket_Triage.json");
    assert!(!s.designer.is_dirty());

    let on_disk = std::fs::read_to_string(s.downloads.dir().join(&file)).unwrap();
    assert_eq!(s.store.get(&key).unwrap().as_deref(), Some(on_disk.as_str()));

    let id = s.designer.document().id.clone();
    let reloaded = toolbar::load_from_store(s.store.as_ref(), &id).unwrap();
    assert_eq!(&reloaded, s.designer.document());
    assert_eq!(reloaded.nodes[1].tags, vec!["notify", "email"]);
    assert_eq!(reloaded.edges.len(), 1);
}

#[tokio::test]
async fn test_delete_node_cascades_after_confirmation() {
    let mut s = session("Cascade").await;
    drop_agent(&mut s.designer, "a1", 200.0, 100.0);
    drop_agent(&mut s.designer, "a2", 600.0, 100.0);
    drop_agent(&mut s.designer, "a3", 1000.0, 100.0);
    let ids: Vec<String> = s.designer.document().nodes.iter().map(|n| n.id.clone()).collect();
    for (source, target) in [(0, 1), (1, 2), (0, 2)] {
        s.designer
            .dispatch(Intent::ConnectNodes {
                source: ids[source].clone(),
                target: ids[target].clone(),
            })
            .unwrap();
    }

    let outcome = s.designer.dispatch(Intent::DeleteNode(ids[1].clone())).unwrap();
    assert_eq!(
        outcome,
        Outcome::ConfirmationRequired(PendingAction::DeleteNode(ids[1].clone()))
    );
    s.designer.dispatch(Intent::Confirm).unwrap();

    let doc = s.designer.document();
    assert_eq!(doc.nodes.len(), 2);
    assert_eq!(doc.edges.len(), 1);
    assert!(doc.edges.iter().all(|e| !e.touches(&ids[1])));
    assert!(doc.validate().is_ok());
}

#[tokio::test]
async fn test_export_then_open_file() {
    let mut s = session("Round Trip").await;
    drop_agent(&mut s.designer, "a2", 400.0, 300.0);
    let outcome = s.designer.dispatch(Intent::Export).unwrap();
    assert_eq!(
        outcome,
        Outcome::Exported {
            file: "Round_Trip_export.json".into()
        }
    );
    assert!(s.designer.is_dirty());
    assert!(s.store.keys("workflow_").unwrap().is_empty());

    let path = s.downloads.dir().join("Round_Trip_export.json");
    let doc = toolbar::load_from_file(&path).unwrap();
    assert_eq!(doc.nodes[0].node_type, NodeType::Agent);

    let mut other = session("Other").await;
    other.designer.dispatch(Intent::Load(doc.clone())).unwrap();
    assert_eq!(other.designer.document(), &doc);
    assert!(!other.designer.is_dirty());
}

#[tokio::test]
async fn test_unreachable_catalog_still_opens_editor() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::open(&dir.path().join("w.db")).unwrap());
    let downloads = Arc::new(FileDownloads::new(dir.path()));
    let mut designer = Designer::new("Offline", store, downloads);
    designer.init(&FailingCatalog).await.unwrap();

    assert_eq!(designer.phase(), Phase::Ready);
    assert!(designer.catalog().is_empty());
    assert_eq!(
        designer.palette().view(""),
        flowdeck_designer::PaletteView::Empty
    );
    assert_eq!(designer.dispatch(Intent::ZoomIn).unwrap(), Outcome::Changed);
}

#[tokio::test]
async fn test_zoom_bounds_and_reset() {
    let mut s = session("Zoom").await;
    for _ in 0..25 {
        s.designer.dispatch(Intent::ZoomOut).unwrap();
    }
    assert_eq!(s.designer.canvas().viewport.zoom(), 0.1);
    for _ in 0..40 {
        s.designer.dispatch(Intent::Wheel { delta_y: -1.0 }).unwrap();
    }
    assert_eq!(s.designer.canvas().viewport.zoom(), 2.0);
    s.designer.dispatch(Intent::ResetView).unwrap();
    assert_eq!(s.designer.canvas().viewport.zoom(), 1.0);
    assert_eq!(s.designer.canvas().viewport.offset, Position::new(0.0, 0.0));
}
