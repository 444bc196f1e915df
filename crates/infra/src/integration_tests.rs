//! End-to-end workflow tests through the engine.
//!
//! Covers the purchase → invoice → receive → ledger chain, the request
//! approval chain, rollback of composed steps, and the two write races
//! (concurrent debits, concurrent invoice generation).

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use serde_json::Value as JsonValue;

    use flockerp_approvals::{ApprovalDecision, EmployeeDetails, RequestLine, RequestStatus};
    use flockerp_auth::{Actor, Role};
    use flockerp_core::{DomainError, UserId};
    use flockerp_events::{EventBus, EventEnvelope, InMemoryEventBus};
    use flockerp_invoicing::{InvoiceLine, InvoiceStatus};
    use flockerp_purchasing::{OrderLine, OrderStatus, SupplierDetails};
    use flockerp_receiving::StockStatus;
    use flockerp_sales::CustomerDetails;
    use flockerp_stock::{FeedCompany, FeedType, ItemKind, PriceHints};

    use crate::config::EngineConfig;
    use crate::engine::Engine;
    use crate::error::WorkflowError;
    use crate::event_store::InMemoryEventStore;
    use crate::notify::{Notification, Notifier, NotifyError, RecordingNotifier};
    use crate::workflows::invoices::ManualInvoice;
    use crate::workflows::orders::NewOrder;
    use crate::workflows::requests::NewRequest;
    use crate::workflows::sales::NewChickenOrder;

    type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
    type TestEngine = Engine<InMemoryEventStore, Bus>;

    fn actor(role: Role) -> Actor {
        Actor::new(UserId::new(), role)
    }

    fn setup() -> (TestEngine, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let config = EngineConfig {
            max_conflict_retries: 64,
            ..EngineConfig::default()
        };
        let engine = Engine::new(InMemoryEventStore::new(), Arc::new(InMemoryEventBus::new()), config)
            .with_notifier(notifier.clone());
        (engine, notifier)
    }

    fn domain(err: WorkflowError) -> DomainError {
        match err {
            WorkflowError::Domain(err) => err,
            other => panic!("expected a domain error, got {other:?}"),
        }
    }

    fn new_order(number: &str, lines: Vec<OrderLine>) -> NewOrder {
        NewOrder {
            order_number: number.to_string(),
            order_date: None,
            supplier: SupplierDetails {
                company_name: "Hillside Hatchery".to_string(),
                ..SupplierDetails::default()
            },
            lines,
            claimed_total: None,
        }
    }

    fn approved_order(engine: &TestEngine, number: &str, lines: Vec<OrderLine>) {
        engine
            .create_order(&actor(Role::OrderManager), new_order(number, lines))
            .unwrap();
        engine
            .transition_order(&actor(Role::Accountant), number, OrderStatus::InProgress, None)
            .unwrap();
        engine
            .transition_order(&actor(Role::Executive), number, OrderStatus::Approved, None)
            .unwrap();
    }

    /// Order approved, invoiced, and the invoice fully approved.
    fn receivable_order(engine: &TestEngine, number: &str, lines: Vec<OrderLine>) {
        approved_order(engine, number, lines);
        let invoice = engine
            .generate_invoice_from_order(&actor(Role::Accountant), number, 0)
            .unwrap();
        engine
            .transition_invoice(&actor(Role::Manager), invoice.id_typed(), InvoiceStatus::ManagerApproved, None)
            .unwrap();
        engine
            .transition_invoice(&actor(Role::Executive), invoice.id_typed(), InvoiceStatus::Approved, None)
            .unwrap();
    }

    #[test]
    fn ledger_debit_beyond_on_hand_leaves_entry_unchanged() {
        let (engine, _) = setup();
        let manager = actor(Role::Manager);
        engine
            .credit_stock(
                &actor(Role::Admin),
                ItemKind::BroilerChicks,
                1000,
                PriceHints {
                    selling_unit_price: Some(5),
                    ..PriceHints::default()
                },
            )
            .unwrap();
        assert_eq!(engine.ledger_entry(ItemKind::BroilerChicks).unwrap().on_hand(), 1000);

        let entry = engine.debit_stock(&manager, ItemKind::BroilerChicks, 400).unwrap();
        assert_eq!(entry.on_hand(), 600);
        assert_eq!(entry.total_sold(), 400);

        let err = domain(engine.debit_stock(&manager, ItemKind::BroilerChicks, 700).unwrap_err());
        assert!(matches!(
            err,
            DomainError::InsufficientStock { available: 600, requested: 700, .. }
        ));
        let entry = engine.ledger_entry(ItemKind::BroilerChicks).unwrap();
        assert_eq!(entry.on_hand(), 600);
        assert_eq!(entry.total_sold(), 400);
    }

    #[test]
    fn partial_receipts_accumulate_and_over_receipt_is_rejected() {
        let (engine, notifier) = setup();
        receivable_order(&engine, "PO-B", vec![OrderLine::new("Broiler chicks", 100, 900)]);

        let items = engine.stock_items_for_order("PO-B").unwrap();
        assert_eq!(items.len(), 1);
        let item_id = items[0].id_typed();
        let receiver = actor(Role::OrderManager);

        let item = engine.receive_stock(&receiver, item_id, 60, None).unwrap();
        assert_eq!(item.status(), StockStatus::PartiallyReceived);
        assert_eq!(item.received_quantity(), 60);

        let err = domain(engine.receive_stock(&receiver, item_id, 50, None).unwrap_err());
        assert!(matches!(err, DomainError::OverReceipt { would_be: 110, expected: 100 }));
        assert_eq!(engine.stock_item(item_id).unwrap().received_quantity(), 60);

        let item = engine
            .receive_stock(&receiver, item_id, 40, Some("second truck".to_string()))
            .unwrap();
        assert_eq!(item.status(), StockStatus::FullyReceived);
        assert_eq!(item.received_quantity(), 100);

        engine.approve_stock(&actor(Role::Accountant), item_id).unwrap();
        let entry = engine.ledger_entry(ItemKind::BroilerChicks).unwrap();
        assert_eq!(entry.on_hand(), 100);
        assert_eq!(entry.total_received(), 100);
        assert_eq!(entry.buying_unit_price(), Some(900));
        assert_eq!(entry.container_price(), 900 * 100);
        assert!(!notifier.messages_for(Role::OrderManager).is_empty());
    }

    #[test]
    fn only_the_accountant_moves_a_pending_order_forward() {
        let (engine, _) = setup();
        engine
            .create_order(
                &actor(Role::OrderManager),
                new_order("PO-C", vec![OrderLine::new("Sasso chicks", 10, 1_000)]),
            )
            .unwrap();

        let err = domain(
            engine
                .transition_order(&actor(Role::Manager), "PO-C", OrderStatus::InProgress, None)
                .unwrap_err(),
        );
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
        assert_eq!(engine.order("PO-C").unwrap().status(), OrderStatus::Pending);

        let order = engine
            .transition_order(&actor(Role::Accountant), "PO-C", OrderStatus::InProgress, None)
            .unwrap();
        assert_eq!(order.status(), OrderStatus::InProgress);
    }

    #[test]
    fn invoice_totals_come_from_recomputed_lines() {
        let (engine, notifier) = setup();
        let mut order = new_order("PO-D", vec![OrderLine::new("Broiler chicks", 3, 50)]);
        order.claimed_total = Some(999);
        engine.create_order(&actor(Role::OrderManager), order).unwrap();
        engine
            .transition_order(&actor(Role::Accountant), "PO-D", OrderStatus::InProgress, None)
            .unwrap();
        engine
            .transition_order(&actor(Role::Manager), "PO-D", OrderStatus::Approved, None)
            .unwrap();
        assert_eq!(engine.order("PO-D").unwrap().total_amount(), 150);

        let invoice = engine
            .generate_invoice_from_order(&actor(Role::Accountant), "PO-D", 0)
            .unwrap();
        assert_eq!(invoice.subtotal(), 150);
        assert_eq!(invoice.total(), 150);
        assert_eq!(invoice.status(), InvoiceStatus::Pending);
        assert!(invoice.invoice_number().starts_with("INVOICE-"));
        assert_eq!(
            engine.order("PO-D").unwrap().invoice_id(),
            Some(invoice.id_typed().0)
        );
        assert_eq!(notifier.messages_for(Role::Manager).len(), 2);
    }

    #[test]
    fn invoiced_request_cannot_be_invoiced_again() {
        let (engine, notifier) = setup();
        let bus_events = engine.bus().subscribe();
        let request = engine
            .create_request(
                &actor(Role::OrderManager),
                NewRequest {
                    request_date: None,
                    task_type: Some("Vaccination".to_string()),
                    employee: EmployeeDetails {
                        name: "Juma".to_string(),
                        ..EmployeeDetails::default()
                    },
                    lines: vec![RequestLine::new("Newcastle vaccine", 4, 2_500)],
                    transaction_charges: 300,
                },
            )
            .unwrap();
        assert_eq!(request.subtotal(), 10_000);
        assert_eq!(request.total(), 10_300);
        assert!(request.request_number().ends_with("-001"));

        engine
            .decide_request(&actor(Role::Manager), request.id_typed(), RequestStatus::Approved, None)
            .unwrap();
        assert_eq!(notifier.messages_for(Role::Accountant).len(), 1);

        let accountant = actor(Role::Accountant);
        let invoice = engine
            .generate_invoice_from_request(&accountant, request.id_typed())
            .unwrap();
        assert_eq!(invoice.subtotal(), 10_000);
        assert_eq!(
            engine.request(request.id_typed()).unwrap().status(),
            RequestStatus::Invoiced
        );

        let err = domain(
            engine
                .generate_invoice_from_request(&accountant, request.id_typed())
                .unwrap_err(),
        );
        assert!(matches!(err, DomainError::Duplicate(_)));

        let issued = bus_events
            .drain()
            .into_iter()
            .filter(|e| e.event_type() == "invoicing.invoice.issued")
            .count();
        assert_eq!(issued, 1);
    }

    #[test]
    fn request_numbers_are_sequential_per_day() {
        let (engine, _) = setup();
        let numbers: Vec<String> = (0..3)
            .map(|_| {
                engine
                    .create_request(
                        &actor(Role::Accountant),
                        NewRequest {
                            request_date: None,
                            task_type: None,
                            employee: EmployeeDetails {
                                name: "Neema".to_string(),
                                ..EmployeeDetails::default()
                            },
                            lines: vec![RequestLine::new("Fuel", 1, 100)],
                            transaction_charges: 0,
                        },
                    )
                    .unwrap()
                    .request_number()
                    .to_string()
            })
            .collect();
        assert!(numbers[0].ends_with("-001"));
        assert!(numbers[1].ends_with("-002"));
        assert!(numbers[2].ends_with("-003"));
    }

    #[test]
    fn invoice_approval_spawns_items_and_logs_decisions() {
        let (engine, notifier) = setup();
        receivable_order(
            &engine,
            "PO-F",
            vec![
                OrderLine::new("Sasso chicks", 200, 1_100),
                OrderLine::new("Broiler starter MP feed", 10, 40_000),
                OrderLine::new("Transport", 1, 20_000),
            ],
        );

        let items = engine.stock_items_for_order("PO-F").unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.status() == StockStatus::Pending));

        let order = engine.order("PO-F").unwrap();
        let invoice_id = flockerp_invoicing::InvoiceId(order.invoice_id().unwrap());
        let log = engine.approval_log(invoice_id).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].approver_role, Role::Manager);
        assert_eq!(log[1].approver_role, Role::Executive);
        assert!(log.iter().all(|r| r.decision == ApprovalDecision::Approved));
        assert_eq!(engine.invoice(invoice_id).unwrap().status(), InvoiceStatus::Approved);
        assert!(!notifier.messages_for(Role::Executive).is_empty());

        // Feed goes to a feed record, not the ledger.
        let feed = &items[1];
        engine
            .receive_stock(&actor(Role::OrderManager), feed.id_typed(), 10, None)
            .unwrap();
        engine.approve_stock(&actor(Role::Accountant), feed.id_typed()).unwrap();
        let record = engine.feed_record(feed.id_typed()).unwrap();
        assert_eq!(record.feed_type(), Some(FeedType::BroilerStarterMp));
        assert_eq!(record.company(), Some(FeedCompany::Arvines));
        assert_eq!(record.total_price(), 400_000);
        assert!(engine.ledger_entry(ItemKind::SassoChicks).is_err());

        let err = domain(engine.spawn_from_approved_order("PO-F").unwrap_err());
        assert!(matches!(err, DomainError::Duplicate(_)));
    }

    #[test]
    fn failed_spawn_rolls_back_invoice_approval() {
        let (engine, _) = setup();
        approved_order(
            &engine,
            "PO-R",
            vec![
                OrderLine::new("Broiler chicks", 50, 900),
                OrderLine::new("Premium feed bags", 5, 30_000),
            ],
        );
        let invoice = engine
            .generate_invoice_from_order(&actor(Role::Accountant), "PO-R", 0)
            .unwrap();
        engine
            .transition_invoice(&actor(Role::Manager), invoice.id_typed(), InvoiceStatus::ManagerApproved, None)
            .unwrap();

        let err = domain(
            engine
                .transition_invoice(&actor(Role::Executive), invoice.id_typed(), InvoiceStatus::Approved, None)
                .unwrap_err(),
        );
        assert!(matches!(err, DomainError::Classification(_)));

        assert_eq!(
            engine.invoice(invoice.id_typed()).unwrap().status(),
            InvoiceStatus::ManagerApproved
        );
        assert_eq!(engine.approval_log(invoice.id_typed()).unwrap().len(), 1);
        assert!(engine.stock_items_for_order("PO-R").unwrap().is_empty());
    }

    #[test]
    fn approving_stock_twice_credits_once() {
        let (engine, _) = setup();
        receivable_order(&engine, "PO-I", vec![OrderLine::new("Sasso chicks", 30, 1_000)]);
        let item_id = engine.stock_items_for_order("PO-I").unwrap()[0].id_typed();
        engine
            .receive_stock(&actor(Role::OrderManager), item_id, 30, None)
            .unwrap();

        let accountant = actor(Role::Accountant);
        engine.approve_stock(&accountant, item_id).unwrap();
        let err = domain(engine.approve_stock(&accountant, item_id).unwrap_err());
        assert!(matches!(err, DomainError::InvalidTransition { .. }));

        let err = domain(
            engine
                .receive_stock(&actor(Role::OrderManager), item_id, 1, None)
                .unwrap_err(),
        );
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
        assert_eq!(engine.ledger_entry(ItemKind::SassoChicks).unwrap().on_hand(), 30);
    }

    #[test]
    fn cancelled_invoice_is_logged_as_rejected() {
        let (engine, notifier) = setup();
        let invoice = engine
            .create_manual_invoice(
                &actor(Role::Accountant),
                ManualInvoice {
                    lines: vec![InvoiceLine::new("Consulting", 2, 7_500)],
                    tax: 1_000,
                    notes: None,
                    invoice_date: None,
                },
            )
            .unwrap();
        assert_eq!(invoice.total(), 16_000);

        engine
            .transition_invoice(
                &actor(Role::Manager),
                invoice.id_typed(),
                InvoiceStatus::Cancelled,
                Some("duplicate entry".to_string()),
            )
            .unwrap();
        let log = engine.approval_log(invoice.id_typed()).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].decision, ApprovalDecision::Rejected);
        assert_eq!(log[0].comments.as_deref(), Some("duplicate entry"));
        assert!(
            notifier
                .messages_for(Role::Accountant)
                .iter()
                .any(|m| m.contains("cancelled"))
        );

        let err = domain(
            engine
                .transition_invoice(&actor(Role::Executive), invoice.id_typed(), InvoiceStatus::Approved, None)
                .unwrap_err(),
        );
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[test]
    fn stock_is_not_spawned_before_the_invoice_is_approved() {
        let (engine, _) = setup();
        approved_order(&engine, "PO-P", vec![OrderLine::new("Broiler chicks", 100, 900)]);
        let invoice = engine
            .generate_invoice_from_order(&actor(Role::Accountant), "PO-P", 0)
            .unwrap();

        let err = domain(engine.spawn_from_approved_order("PO-P").unwrap_err());
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert!(engine.stock_items_for_order("PO-P").unwrap().is_empty());

        engine
            .transition_invoice(&actor(Role::Manager), invoice.id_typed(), InvoiceStatus::ManagerApproved, None)
            .unwrap();
        let err = domain(engine.spawn_from_approved_order("PO-P").unwrap_err());
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert!(engine.stock_items_for_order("PO-P").unwrap().is_empty());
        assert!(engine.ledger_entry(ItemKind::BroilerChicks).is_err());

        // The refused attempts leave the final approval free to spawn.
        engine
            .transition_invoice(&actor(Role::Executive), invoice.id_typed(), InvoiceStatus::Approved, None)
            .unwrap();
        let items = engine.stock_items_for_order("PO-P").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].expected_quantity(), 100);
    }

    #[test]
    fn cancelled_order_invoice_spawns_no_stock() {
        let (engine, _) = setup();
        approved_order(&engine, "PO-X", vec![OrderLine::new("Sasso chicks", 300, 1_100)]);
        let invoice = engine
            .generate_invoice_from_order(&actor(Role::Accountant), "PO-X", 0)
            .unwrap();
        engine
            .transition_invoice(&actor(Role::Manager), invoice.id_typed(), InvoiceStatus::ManagerApproved, None)
            .unwrap();
        engine
            .transition_invoice(
                &actor(Role::Executive),
                invoice.id_typed(),
                InvoiceStatus::Cancelled,
                Some("supplier withdrew".to_string()),
            )
            .unwrap();

        assert_eq!(engine.invoice(invoice.id_typed()).unwrap().status(), InvoiceStatus::Cancelled);
        assert!(engine.stock_items_for_order("PO-X").unwrap().is_empty());

        let err = domain(engine.spawn_from_approved_order("PO-X").unwrap_err());
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert!(engine.stock_items_for_order("PO-X").unwrap().is_empty());
        assert!(engine.ledger_entry(ItemKind::SassoChicks).is_err());
    }

    #[test]
    fn invoicing_an_unapproved_order_names_the_callers_role() {
        let (engine, _) = setup();
        engine
            .create_order(
                &actor(Role::OrderManager),
                new_order("PO-U", vec![OrderLine::new("Broiler chicks", 10, 900)]),
            )
            .unwrap();

        let err = domain(
            engine
                .generate_invoice_from_order(&actor(Role::Admin), "PO-U", 0)
                .unwrap_err(),
        );
        match err {
            DomainError::InvalidTransition { entity, from, role, .. } => {
                assert_eq!(entity, "order");
                assert_eq!(from, OrderStatus::Pending.to_string());
                assert_eq!(role, Role::Admin.to_string());
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
        assert!(engine.order("PO-U").unwrap().invoice_id().is_none());
    }

    #[test]
    fn customer_orders_move_stock_through_the_ledger() {
        let (engine, notifier) = setup();
        let admin = actor(Role::Admin);
        engine
            .credit_stock(&admin, ItemKind::SassoChicks, 300, PriceHints::default())
            .unwrap();
        let seller = actor(Role::OrderManager);
        let order = NewChickenOrder {
            customer: CustomerDetails {
                name: "Amina".to_string(),
                email: Some("amina@example.com".to_string()),
                phone: None,
            },
            item_kind: ItemKind::SassoChicks,
            quantity: 50,
            unit_price: None,
        };

        let err = domain(engine.place_chicken_order(&seller, order.clone()).unwrap_err());
        assert!(matches!(err, DomainError::Validation(_)));

        engine
            .set_pricing(
                &admin,
                ItemKind::SassoChicks,
                PriceHints {
                    selling_unit_price: Some(1_500),
                    ..PriceHints::default()
                },
            )
            .unwrap();
        let placed = engine.place_chicken_order(&seller, order).unwrap();
        assert_eq!(placed.total(), 75_000);
        assert_eq!(engine.ledger_entry(ItemKind::SassoChicks).unwrap().on_hand(), 250);
        assert!(
            notifier
                .sent()
                .iter()
                .any(|n| matches!(n, Notification::Customer { amount: 75_000, .. }))
        );

        engine
            .change_chicken_order_quantity(&seller, placed.id_typed(), 80)
            .unwrap();
        assert_eq!(engine.ledger_entry(ItemKind::SassoChicks).unwrap().on_hand(), 220);

        let changed = engine
            .change_chicken_order_quantity(&seller, placed.id_typed(), 20)
            .unwrap();
        assert_eq!(changed.total(), 30_000);
        let entry = engine.ledger_entry(ItemKind::SassoChicks).unwrap();
        assert_eq!(entry.on_hand(), 280);
        assert_eq!(entry.total_sold(), 20);
    }

    #[test]
    fn low_stock_after_a_debit_alerts_managers() {
        let (engine, notifier) = setup();
        engine
            .credit_stock(&actor(Role::Admin), ItemKind::BroilerChicks, 150, PriceHints::default())
            .unwrap();
        engine
            .debit_stock(&actor(Role::Manager), ItemKind::BroilerChicks, 40)
            .unwrap();
        assert!(notifier.messages_for(Role::Manager).is_empty());

        engine
            .debit_stock(&actor(Role::Manager), ItemKind::BroilerChicks, 20)
            .unwrap();
        assert_eq!(notifier.messages_for(Role::Manager).len(), 1);
        assert_eq!(engine.list_below_threshold().unwrap().len(), 1);
    }

    #[test]
    fn customers_cannot_create_orders() {
        let (engine, _) = setup();
        let err = domain(
            engine
                .create_order(
                    &actor(Role::Customer),
                    new_order("PO-X", vec![OrderLine::new("Sasso chicks", 1, 1)]),
                )
                .unwrap_err(),
        );
        assert!(matches!(err, DomainError::Unauthorized { .. }));
        assert!(engine.order("PO-X").is_err());
    }

    #[test]
    fn concurrent_debits_never_oversell() {
        let (engine, _) = setup();
        engine
            .credit_stock(&actor(Role::Admin), ItemKind::BroilerChicks, 1000, PriceHints::default())
            .unwrap();

        let results: Vec<Result<_, WorkflowError>> = thread::scope(|s| {
            let handles: Vec<_> = (0..10)
                .map(|_| {
                    let engine = &engine;
                    s.spawn(move || engine.debit_stock(&actor(Role::Manager), ItemKind::BroilerChicks, 150))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(succeeded, 6);
        for result in results.into_iter().filter(|r| r.is_err()) {
            let err = domain(result.unwrap_err());
            assert!(matches!(err, DomainError::InsufficientStock { requested: 150, .. }));
        }
        let entry = engine.ledger_entry(ItemKind::BroilerChicks).unwrap();
        assert_eq!(entry.on_hand(), 100);
        assert_eq!(entry.total_sold(), 900);
    }

    #[test]
    fn concurrent_invoice_generation_issues_one_invoice() {
        let (engine, _) = setup();
        approved_order(&engine, "PO-RACE", vec![OrderLine::new("Broiler chicks", 10, 800)]);

        let results: Vec<Result<_, WorkflowError>> = thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let engine = &engine;
                    s.spawn(move || {
                        engine.generate_invoice_from_order(&actor(Role::Accountant), "PO-RACE", 0)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1);
        assert_eq!(
            engine.order("PO-RACE").unwrap().invoice_id(),
            Some(winners[0].id_typed().0)
        );
        for result in results.iter().filter(|r| r.is_err()) {
            assert!(matches!(
                result,
                Err(WorkflowError::Domain(DomainError::Duplicate(_)))
            ));
        }
    }

    #[test]
    fn concurrent_invoices_get_distinct_numbers() {
        let (engine, _) = setup();
        let numbers: Vec<String> = thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let engine = &engine;
                    s.spawn(move || {
                        engine
                            .create_manual_invoice(
                                &actor(Role::Accountant),
                                ManualInvoice {
                                    lines: vec![InvoiceLine::new("Service", 1, 100)],
                                    tax: 0,
                                    notes: None,
                                    invoice_date: None,
                                },
                            )
                            .map(|i| i.invoice_number().to_string())
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect()
        });

        let mut unique = numbers.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 8);
    }

    struct FailingNotifier;

    impl Notifier for FailingNotifier {
        fn notify_role(&self, _: Role, _: &str) -> Result<(), NotifyError> {
            Err(NotifyError("mail relay down".to_string()))
        }

        fn notify_customer(&self, _: &str, _: &str, _: u64, _: Option<&str>) -> Result<(), NotifyError> {
            Err(NotifyError("mail relay down".to_string()))
        }
    }

    #[test]
    fn notifier_failures_do_not_fail_transitions() {
        let engine = Engine::new(
            InMemoryEventStore::new(),
            Arc::new(InMemoryEventBus::<EventEnvelope<JsonValue>>::new()),
            EngineConfig::default(),
        )
        .with_notifier(Arc::new(FailingNotifier));

        engine
            .create_order(
                &actor(Role::OrderManager),
                new_order("PO-N", vec![OrderLine::new("Sasso chicks", 5, 1_000)]),
            )
            .unwrap();
        let order = engine
            .transition_order(&actor(Role::Accountant), "PO-N", OrderStatus::InProgress, None)
            .unwrap();
        assert_eq!(order.status(), OrderStatus::InProgress);
    }
}
