//! Dev server for the patient data layer
//!
//! Serves the `/patient-data` surface over an in-process store. A real
//! deployment swaps the store for the hosted database client; the HTTP
//! shape is identical.

use anyhow::Result;
use chartsync_aggregator::{router, AggregatorService};
use chartsync_domain::{MemoryStore, Table};
use clap::Parser;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "chartsync-server", about = "Patient data aggregation service")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8787", env = "CHARTSYNC_BIND")]
    bind: SocketAddr,

    /// Seed a demo patient so GET has something to return
    #[arg(long)]
    seed_demo: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let store = Arc::new(MemoryStore::new());
    if args.seed_demo {
        seed_demo(&store);
        tracing::info!("seeded demo patient p-demo");
    }

    let app = router(Arc::new(AggregatorService::new(store)));
    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

fn seed_demo(store: &MemoryStore) {
    let row = |v: serde_json::Value| v.as_object().cloned().unwrap_or_default();
    store.seed(
        Table::Patients,
        [row(json!({
            "id": "p-demo",
            "first_name": "Ada",
            "last_name": "Quinn",
            "email": "ada.quinn@example.com",
            "phone": "555-0100",
            "chart_number": "CH-1001",
        }))],
    );
    store.seed(
        Table::Medications,
        [
            row(json!({"id": "m1", "patient_id": "p-demo", "name": "Lisinopril", "dose": "10mg"})),
            row(json!({"id": "m2", "patient_id": "p-demo", "name": "Aspirin", "dose": "81mg", "source": "drchrono"})),
        ],
    );
    store.seed(
        Table::Problems,
        [row(
            json!({"id": "pr1", "patient_id": "p-demo", "description": "Hypertension", "status": "active"}),
        )],
    );
    store.seed(
        Table::Appointments,
        [row(json!({
            "id": "a1",
            "patient_id": "p-demo",
            "scheduled_at": "2026-03-02T14:30:00Z",
            "reason": "Follow-up",
        }))],
    );
}
