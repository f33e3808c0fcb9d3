// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::Connection;
use rust_decimal::Decimal;
use spendlog::engine::{NewTransaction, TransactionEngine, TransactionPatch};
use spendlog::models::{TransferShape, Unit, UnitType, User};
use spendlog::rates::RateTable;
use spendlog::units::{create_unit, get_unit, update_unit, NewUnit, UnitPatch};
use spendlog::users::create_user;
use spendlog::utils::MAX_AMOUNT;
use spendlog::{db, Error};

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn setup() -> (Connection, User) {
    let conn = db::open_in_memory().unwrap();
    let rates = RateTable::new(&conn);
    rates.upsert("USD", d("1.0")).unwrap();
    rates.upsert("EUR", d("0.9")).unwrap();
    let alice = create_user(&conn, "alice", false).unwrap();
    (conn, alice)
}

fn unit(conn: &Connection, owner: &User, name: &str, t: UnitType, ccy: &str, bal: &str) -> Unit {
    create_unit(conn, &NewUnit::new(name, t, ccy, owner.id).opening_balance(d(bal))).unwrap()
}

fn balance(conn: &Connection, u: &Unit) -> Decimal {
    get_unit(conn, u.id).unwrap().balance
}

fn transfer(src: &Unit, dst: &Unit, s: Option<&str>, dd: Option<&str>) -> NewTransaction {
    NewTransaction {
        source_unit: src.id,
        destination_unit: dst.id,
        source_amount: s.map(d),
        destination_amount: dd.map(d),
    }
}

fn transaction_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap()
}

#[test]
fn income_into_account_and_back() {
    let (conn, alice) = setup();
    let salary = unit(&conn, &alice, "Salary", UnitType::Income, "USD", "0");
    let checking = unit(&conn, &alice, "Checking", UnitType::Account, "USD", "100");
    let table = RateTable::new(&conn);
    let engine = TransactionEngine::new(&conn, &table);

    let t = engine
        .create_transaction(&alice, transfer(&salary, &checking, Some("500"), None))
        .unwrap();
    assert_eq!(t.destination_amount, d("500"));
    assert_eq!(t.shape, TransferShape::IncomeToAccount);
    assert_eq!(t.owner, alice.id);
    assert_eq!(balance(&conn, &salary), d("500"));
    assert_eq!(balance(&conn, &checking), d("600"));

    engine.delete_transaction(&alice, t.id).unwrap();
    assert_eq!(balance(&conn, &salary), d("0"));
    assert_eq!(balance(&conn, &checking), d("100"));
    assert_eq!(transaction_count(&conn), 0);
}

#[test]
fn account_to_foreign_expense_converts_destination() {
    let (conn, alice) = setup();
    let checking = unit(&conn, &alice, "Checking", UnitType::Account, "USD", "600");
    let rent = unit(&conn, &alice, "Rent", UnitType::Expense, "EUR", "0");
    let table = RateTable::new(&conn);
    let engine = TransactionEngine::new(&conn, &table);

    let t = engine
        .create_transaction(&alice, transfer(&checking, &rent, Some("100"), None))
        .unwrap();
    assert_eq!(t.destination_amount, d("90"));
    assert_eq!(t.shape, TransferShape::AccountOutflow);
    assert_eq!(balance(&conn, &checking), d("500"));
    assert_eq!(balance(&conn, &rent), d("90"));
}

#[test]
fn destination_only_derives_source() {
    let (conn, alice) = setup();
    let checking = unit(&conn, &alice, "Checking", UnitType::Account, "USD", "600");
    let rent = unit(&conn, &alice, "Rent", UnitType::Expense, "EUR", "0");
    let table = RateTable::new(&conn);
    let engine = TransactionEngine::new(&conn, &table);

    let t = engine
        .create_transaction(&alice, transfer(&checking, &rent, None, Some("45")))
        .unwrap();
    assert_eq!(t.source_amount, d("50"));
    assert_eq!(balance(&conn, &checking), d("550"));
    assert_eq!(balance(&conn, &rent), d("45"));
}

#[test]
fn both_amounts_are_taken_as_given() {
    let (conn, alice) = setup();
    let checking = unit(&conn, &alice, "Checking", UnitType::Account, "USD", "600");
    let travel = unit(&conn, &alice, "Travel", UnitType::Account, "EUR", "10");
    let table = RateTable::new(&conn);
    let engine = TransactionEngine::new(&conn, &table);

    let t = engine
        .create_transaction(&alice, transfer(&checking, &travel, Some("100"), Some("85.50")))
        .unwrap();
    assert_eq!(t.destination_amount, d("85.50"));
    assert_eq!(balance(&conn, &checking), d("500"));
    assert_eq!(balance(&conn, &travel), d("95.50"));
}

#[test]
fn disallowed_shapes_leave_balances_untouched() {
    let (conn, alice) = setup();
    let salary = unit(&conn, &alice, "Salary", UnitType::Income, "USD", "0");
    let checking = unit(&conn, &alice, "Checking", UnitType::Account, "USD", "100");
    let food = unit(&conn, &alice, "Food", UnitType::Expense, "USD", "20");
    let table = RateTable::new(&conn);
    let engine = TransactionEngine::new(&conn, &table);

    for (src, dst) in [
        (&food, &checking),
        (&food, &salary),
        (&checking, &salary),
        (&salary, &food),
    ] {
        let err = engine
            .create_transaction(&alice, transfer(src, dst, Some("5"), None))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransferShape(_)), "{:?}", err);
    }
    let err = engine
        .create_transaction(&alice, transfer(&checking, &checking, Some("5"), None))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidTransferShape(_)));

    assert_eq!(balance(&conn, &salary), d("0"));
    assert_eq!(balance(&conn, &checking), d("100"));
    assert_eq!(balance(&conn, &food), d("20"));
    assert_eq!(transaction_count(&conn), 0);
}

#[test]
fn amount_validation() {
    let (conn, alice) = setup();
    let checking = unit(&conn, &alice, "Checking", UnitType::Account, "USD", "100");
    let food = unit(&conn, &alice, "Food", UnitType::Expense, "USD", "0");
    let table = RateTable::new(&conn);
    let engine = TransactionEngine::new(&conn, &table);

    let err = engine
        .create_transaction(&alice, transfer(&checking, &food, None, None))
        .unwrap_err();
    assert!(matches!(err, Error::MissingAmount));

    let err = engine
        .create_transaction(&alice, transfer(&checking, &food, Some("-1"), None))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidAmount(_)));

    let err = engine
        .create_transaction(&alice, transfer(&checking, &food, Some("1.005"), None))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidAmount(_)));

    assert_eq!(balance(&conn, &checking), d("100"));
    assert_eq!(transaction_count(&conn), 0);
}

#[test]
fn missing_rate_fails_the_whole_transaction() {
    let (conn, alice) = setup();
    RateTable::new(&conn).upsert("GBP", d("0.8")).unwrap();
    let checking = unit(&conn, &alice, "Checking", UnitType::Account, "USD", "100");
    let pounds = unit(&conn, &alice, "Pounds", UnitType::Account, "GBP", "0");
    // a rate source that has no GBP
    let partial: std::collections::HashMap<String, Decimal> =
        [("USD".to_string(), d("1"))].into_iter().collect();
    let engine = TransactionEngine::new(&conn, &partial);

    let err = engine
        .create_transaction(&alice, transfer(&checking, &pounds, Some("10"), None))
        .unwrap_err();
    assert!(matches!(err, Error::Conversion { .. }));
    assert_eq!(balance(&conn, &checking), d("100"));
    assert_eq!(balance(&conn, &pounds), d("0"));
    assert_eq!(transaction_count(&conn), 0);
}

#[test]
fn amend_moves_balances_by_the_difference() {
    let (conn, alice) = setup();
    let checking = unit(&conn, &alice, "Checking", UnitType::Account, "USD", "600");
    let rent = unit(&conn, &alice, "Rent", UnitType::Expense, "EUR", "0");
    let table = RateTable::new(&conn);
    let engine = TransactionEngine::new(&conn, &table);

    let t = engine
        .create_transaction(&alice, transfer(&checking, &rent, Some("100"), None))
        .unwrap();

    let patch = TransactionPatch {
        source_amount: Some(d("40")),
        ..Default::default()
    };
    let updated = engine.update_transaction(&alice, t.id, patch).unwrap();
    assert_eq!(updated.source_amount, d("40"));
    assert_eq!(updated.destination_amount, d("36"));
    assert_eq!(updated.created_at, t.created_at);
    assert_eq!(balance(&conn, &checking), d("560"));
    assert_eq!(balance(&conn, &rent), d("36"));

    // deleting the amended record returns both units to where they started
    engine.delete_transaction(&alice, t.id).unwrap();
    assert_eq!(balance(&conn, &checking), d("600"));
    assert_eq!(balance(&conn, &rent), d("0"));
}

#[test]
fn amend_equals_reverse_then_apply() {
    let (conn, alice) = setup();
    let salary = unit(&conn, &alice, "Salary", UnitType::Income, "USD", "0");
    let bonus = unit(&conn, &alice, "Bonus", UnitType::Income, "USD", "0");
    let checking = unit(&conn, &alice, "Checking", UnitType::Account, "USD", "100");
    let savings = unit(&conn, &alice, "Savings", UnitType::Account, "EUR", "0");
    let table = RateTable::new(&conn);
    let engine = TransactionEngine::new(&conn, &table);

    let t = engine
        .create_transaction(&alice, transfer(&salary, &checking, Some("300"), None))
        .unwrap();

    // move it to other units and a new amount in one edit
    let patch = TransactionPatch {
        source_unit: Some(bonus.id),
        destination_unit: Some(savings.id),
        source_amount: Some(d("200")),
        destination_amount: None,
    };
    let updated = engine.update_transaction(&alice, t.id, patch).unwrap();
    assert_eq!(updated.destination_amount, d("180"));

    // same end state as deleting the old one and recording the new one
    assert_eq!(balance(&conn, &salary), d("0"));
    assert_eq!(balance(&conn, &checking), d("100"));
    assert_eq!(balance(&conn, &bonus), d("200"));
    assert_eq!(balance(&conn, &savings), d("180"));
}

#[test]
fn amend_can_change_the_shape() {
    let (conn, alice) = setup();
    let salary = unit(&conn, &alice, "Salary", UnitType::Income, "USD", "0");
    let checking = unit(&conn, &alice, "Checking", UnitType::Account, "USD", "100");
    let savings = unit(&conn, &alice, "Savings", UnitType::Account, "USD", "0");
    let table = RateTable::new(&conn);
    let engine = TransactionEngine::new(&conn, &table);

    let t = engine
        .create_transaction(&alice, transfer(&salary, &savings, Some("50"), None))
        .unwrap();
    let patch = TransactionPatch {
        source_unit: Some(checking.id),
        ..Default::default()
    };
    let updated = engine.update_transaction(&alice, t.id, patch).unwrap();
    assert_eq!(updated.shape, TransferShape::AccountOutflow);
    assert_eq!(updated.source_amount, d("50"));
    assert_eq!(balance(&conn, &salary), d("0"));
    assert_eq!(balance(&conn, &checking), d("50"));
    assert_eq!(balance(&conn, &savings), d("50"));
}

#[test]
fn rejected_amend_changes_nothing() {
    let (conn, alice) = setup();
    let checking = unit(&conn, &alice, "Checking", UnitType::Account, "USD", "100");
    let food = unit(&conn, &alice, "Food", UnitType::Expense, "USD", "0");
    let salary = unit(&conn, &alice, "Salary", UnitType::Income, "USD", "0");
    let table = RateTable::new(&conn);
    let engine = TransactionEngine::new(&conn, &table);

    let t = engine
        .create_transaction(&alice, transfer(&checking, &food, Some("30"), None))
        .unwrap();
    let patch = TransactionPatch {
        destination_unit: Some(salary.id),
        source_amount: Some(d("10")),
        ..Default::default()
    };
    let err = engine.update_transaction(&alice, t.id, patch).unwrap_err();
    assert!(matches!(err, Error::InvalidTransferShape(_)));

    let stored = engine.get_transaction(&alice, t.id).unwrap();
    assert_eq!(stored, t);
    assert_eq!(balance(&conn, &checking), d("70"));
    assert_eq!(balance(&conn, &food), d("30"));
}

#[test]
fn reversal_follows_the_recorded_shape_after_retyping() {
    let (conn, alice) = setup();
    let salary = unit(&conn, &alice, "Salary", UnitType::Income, "USD", "0");
    let checking = unit(&conn, &alice, "Checking", UnitType::Account, "USD", "100");
    let table = RateTable::new(&conn);
    let engine = TransactionEngine::new(&conn, &table);

    let t = engine
        .create_transaction(&alice, transfer(&salary, &checking, Some("500"), None))
        .unwrap();
    let patch = UnitPatch {
        unit_type: Some(UnitType::Account),
        ..Default::default()
    };
    update_unit(&conn, salary.id, alice.id, &patch).unwrap();

    engine.delete_transaction(&alice, t.id).unwrap();
    assert_eq!(balance(&conn, &salary), d("0"));
    assert_eq!(balance(&conn, &checking), d("100"));
}

#[test]
fn other_users_cannot_see_or_touch_transactions() {
    let (conn, alice) = setup();
    let bob = create_user(&conn, "bob", false).unwrap();
    let admin = create_user(&conn, "root", true).unwrap();
    let checking = unit(&conn, &alice, "Checking", UnitType::Account, "USD", "100");
    let food = unit(&conn, &alice, "Food", UnitType::Expense, "USD", "0");
    let bobs = unit(&conn, &bob, "Wallet", UnitType::Account, "USD", "10");
    let table = RateTable::new(&conn);
    let engine = TransactionEngine::new(&conn, &table);

    // bob may not move money into alice's units
    let err = engine
        .create_transaction(&bob, transfer(&bobs, &food, Some("5"), None))
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let t = engine
        .create_transaction(&alice, transfer(&checking, &food, Some("25"), None))
        .unwrap();
    assert!(matches!(engine.get_transaction(&bob, t.id), Err(Error::NotFound(_))));
    assert!(matches!(
        engine.delete_transaction(&bob, t.id),
        Err(Error::NotFound(_))
    ));
    assert!(engine.list_transactions(&bob).unwrap().is_empty());

    // an admin edits on alice's behalf; units still have to be alice's
    let err = engine
        .update_transaction(
            &admin,
            t.id,
            TransactionPatch {
                source_unit: Some(bobs.id),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    let updated = engine
        .update_transaction(
            &admin,
            t.id,
            TransactionPatch {
                source_amount: Some(d("20")),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.owner, alice.id);
    assert_eq!(balance(&conn, &checking), d("80"));
    assert_eq!(engine.list_transactions(&admin).unwrap().len(), 1);
}

#[test]
fn oversized_amounts_are_rejected_without_side_effects() {
    let (conn, alice) = setup();
    let salary = unit(&conn, &alice, "Salary", UnitType::Income, "USD", "0");
    let checking = unit(&conn, &alice, "Checking", UnitType::Account, "USD", "100");
    let table = RateTable::new(&conn);
    let engine = TransactionEngine::new(&conn, &table);

    let over_limit = MAX_AMOUNT + d("0.01");
    for amount in [Decimal::MAX, over_limit] {
        let req = NewTransaction {
            source_unit: salary.id,
            destination_unit: checking.id,
            source_amount: Some(amount),
            destination_amount: None,
        };
        let err = engine.create_transaction(&alice, req).unwrap_err();
        assert!(matches!(err, Error::InvalidAmount(_)), "{:?}", err);
    }

    // the amount itself is allowed but would push Checking past the limit;
    // Salary is written first and must be rolled back with it
    let req = NewTransaction {
        source_unit: salary.id,
        destination_unit: checking.id,
        source_amount: Some(MAX_AMOUNT),
        destination_amount: None,
    };
    let err = engine.create_transaction(&alice, req).unwrap_err();
    assert!(matches!(err, Error::InvalidAmount(_)), "{:?}", err);

    assert_eq!(balance(&conn, &salary), d("0"));
    assert_eq!(balance(&conn, &checking), d("100"));
    assert_eq!(transaction_count(&conn), 0);
}

#[test]
fn oversized_amend_keeps_the_old_version() {
    let (conn, alice) = setup();
    let checking = unit(&conn, &alice, "Checking", UnitType::Account, "USD", "100");
    let food = unit(&conn, &alice, "Food", UnitType::Expense, "USD", "0");
    let table = RateTable::new(&conn);
    let engine = TransactionEngine::new(&conn, &table);

    let t = engine
        .create_transaction(&alice, transfer(&checking, &food, Some("30"), None))
        .unwrap();
    let patch = TransactionPatch {
        source_amount: Some(Decimal::MAX),
        ..Default::default()
    };
    let err = engine.update_transaction(&alice, t.id, patch).unwrap_err();
    assert!(matches!(err, Error::InvalidAmount(_)));
    assert_eq!(engine.get_transaction(&alice, t.id).unwrap(), t);
    assert_eq!(balance(&conn, &checking), d("70"));
    assert_eq!(balance(&conn, &food), d("30"));
}
