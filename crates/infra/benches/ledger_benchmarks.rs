use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use flockerp_auth::{Actor, Role};
use flockerp_core::UserId;
use flockerp_events::{EventEnvelope, InMemoryEventBus};
use flockerp_infra::{Engine, EngineConfig, InMemoryEventStore, ManualInvoice, load_aggregate};
use flockerp_invoicing::InvoiceLine;
use flockerp_stock::{ItemKind, LedgerEntryId, PriceHints, StockLedgerEntry};

type BenchEngine = Engine<InMemoryEventStore, Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>>>;

fn engine() -> BenchEngine {
    Engine::new(
        InMemoryEventStore::new(),
        Arc::new(InMemoryEventBus::new()),
        EngineConfig {
            max_conflict_retries: 1024,
            ..EngineConfig::default()
        },
    )
}

fn stocked_engine(quantity: i64) -> (BenchEngine, Actor) {
    let engine = engine();
    let admin = Actor::new(UserId::new(), Role::Admin);
    engine
        .credit_stock(&admin, ItemKind::BroilerChicks, quantity, PriceHints::default())
        .unwrap();
    (engine, admin)
}

fn bench_debit_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger_debit");
    group.throughput(Throughput::Elements(1));

    group.bench_function("debit_one_unit", |b| {
        let (engine, seller) = stocked_engine(1_000_000_000);
        b.iter(|| {
            black_box(
                engine
                    .debit_stock(&seller, ItemKind::BroilerChicks, 1)
                    .unwrap(),
            );
        });
    });

    group.bench_function("rejected_debit", |b| {
        let (engine, seller) = stocked_engine(10);
        b.iter(|| {
            black_box(engine.debit_stock(&seller, ItemKind::BroilerChicks, 11).is_err());
        });
    });

    group.finish();
}

fn bench_contended_debits(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger_contended_debits");

    for threads in [1usize, 2, 4, 8] {
        group.throughput(Throughput::Elements(threads as u64 * 50));
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter(|| {
                let (engine, seller) = stocked_engine(1_000_000);
                std::thread::scope(|s| {
                    for _ in 0..threads {
                        let engine = &engine;
                        s.spawn(move || {
                            for _ in 0..50 {
                                engine.debit_stock(&seller, ItemKind::BroilerChicks, 1).unwrap();
                            }
                        });
                    }
                });
                black_box(engine.ledger_entry(ItemKind::BroilerChicks).unwrap().on_hand());
            });
        });
    }

    group.finish();
}

fn bench_ledger_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger_rebuild");

    for history in [10usize, 100, 1000] {
        let (engine, seller) = stocked_engine(1_000_000);
        for _ in 1..history {
            engine.debit_stock(&seller, ItemKind::BroilerChicks, 1).unwrap();
        }
        let id = LedgerEntryId::for_kind(ItemKind::BroilerChicks).0;

        group.throughput(Throughput::Elements(history as u64));
        group.bench_with_input(BenchmarkId::from_parameter(history), &history, |b, _| {
            b.iter(|| {
                let entry: StockLedgerEntry = load_aggregate(engine.store(), id).unwrap();
                black_box(entry.on_hand());
            });
        });
    }

    group.finish();
}

fn bench_invoice_numbering(c: &mut Criterion) {
    let mut group = c.benchmark_group("invoice_numbering");
    group.bench_function("manual_invoice", |b| {
        let engine = engine();
        let accountant = Actor::new(UserId::new(), Role::Accountant);
        b.iter(|| {
            black_box(
                engine
                    .create_manual_invoice(
                        &accountant,
                        ManualInvoice {
                            lines: vec![InvoiceLine::new("Service", 1, 100)],
                            tax: 0,
                            notes: None,
                            invoice_date: None,
                        },
                    )
                    .unwrap(),
            );
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_debit_latency,
    bench_contended_debits,
    bench_ledger_rebuild,
    bench_invoice_numbering
);
criterion_main!(benches);
