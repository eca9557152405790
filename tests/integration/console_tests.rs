//! Operator console: text lines in, reply lines out.

use crate::mock_hw::{MockActuator, NoDelay, RecordingSink, TestService, factory_service};
use cocktailbot::adapters::nvs::NvsAdapter;
use cocktailbot::adapters::time::FixedClock;
use cocktailbot::adapters::usage::UsageTally;
use cocktailbot::app::console::Console;
use cocktailbot::catalog::Catalog;

type TestConsole = Console<MockActuator, NoDelay, RecordingSink, NvsAdapter, FixedClock>;

fn console() -> TestConsole {
    Console::new(
        Catalog::builtin().unwrap(),
        MockActuator::new(),
        NoDelay::default(),
        RecordingSink::new(),
        UsageTally::load(NvsAdapter::default(), FixedClock(1_700_000_000)),
    )
}

fn run(console: &mut TestConsole, svc: &mut TestService<'_>, line: &str) -> Vec<String> {
    console.handle_line(svc, line)
}

#[test]
fn make_pours_and_counts_the_drink() {
    let nvs = NvsAdapter::default();
    let mut svc = factory_service(&nvs);
    let mut con = console();

    let reply = run(&mut con, &mut svc, "make screwdriver 300");
    assert_eq!(reply, ["OK Screwdriver (300 ml) ready"]);
    assert_eq!(con.actuator().pumps(), [1, 12]);

    run(&mut con, &mut svc, "make screwdriver 200");
    let stats = run(&mut con, &mut svc, "stats");
    assert_eq!(stats[0], "2 poured, 1 different, favourite: Screwdriver");
    assert_eq!(stats[1], "   2x Screwdriver");
    assert_eq!(con.usage().get("screwdriver").unwrap().last_made, 1_700_000_000);
}

#[test]
fn manual_steps_follow_the_ready_line() {
    let nvs = NvsAdapter::default();
    let mut svc = factory_service(&nvs);
    let mut con = console();

    let reply = run(&mut con, &mut svc, "make gin-tonic 200");
    assert_eq!(
        reply,
        [
            "OK Gin & Tonic (200 ml) ready",
            "  then 143ml Tonic Water: top up with tonic",
        ]
    );
    assert_eq!(con.actuator().pumps(), [8, 9]);
}

#[test]
fn errors_come_back_as_a_single_err_line() {
    let nvs = NvsAdapter::default();
    let mut svc = factory_service(&nvs);
    let mut con = console();

    assert_eq!(
        run(&mut con, &mut svc, "make mojito 200"),
        ["ERR unknown cocktail 'mojito' (try 'menu')"]
    );
    assert_eq!(
        run(&mut con, &mut svc, "dance"),
        ["ERR unknown command 'dance' (try 'help')"]
    );
    assert_eq!(
        run(&mut con, &mut svc, "make screwdriver"),
        ["ERR missing argument: size"]
    );

    let reply = run(&mut con, &mut svc, "make screwdriver 250");
    assert_eq!(reply.len(), 1);
    assert!(reply[0].starts_with("ERR "));
    assert!(con.actuator().calls.is_empty());
    assert_eq!(con.usage().totals().total, 0);
}

#[test]
fn check_lists_what_is_short() {
    let nvs = NvsAdapter::default();
    let mut svc = factory_service(&nvs);
    let mut con = console();

    assert_eq!(
        run(&mut con, &mut svc, "check screwdriver 300"),
        ["OK Screwdriver 300ml available"]
    );
    run(&mut con, &mut svc, "level vodka 10");
    assert_eq!(
        run(&mut con, &mut svc, "check screwdriver 300"),
        ["NO Screwdriver 300ml unavailable", "  too low: vodka"]
    );
    assert!(con.actuator().calls.is_empty());
}

#[test]
fn ledger_commands_update_levels() {
    let nvs = NvsAdapter::default();
    let mut svc = factory_service(&nvs);
    let mut con = console();

    assert_eq!(run(&mut con, &mut svc, "level gin 500"), ["OK gin 500/1000 ml"]);
    assert_eq!(run(&mut con, &mut svc, "refill gin 200"), ["OK gin 700/1000 ml"]);
    assert_eq!(run(&mut con, &mut svc, "capacity gin 600"), ["OK gin 600/600 ml"]);
    assert_eq!(run(&mut con, &mut svc, "refill all"), ["OK all ingredients refilled"]);
    assert_eq!(svc.ledger().peek("gin").unwrap().current_ml, 600);
}

#[test]
fn bind_then_pumps_shows_the_table() {
    let nvs = NvsAdapter::default();
    let mut svc = factory_service(&nvs);
    let mut con = console();

    assert_eq!(run(&mut con, &mut svc, "bind 2 soda-water"), ["OK pump 2 -> soda-water"]);
    assert_eq!(run(&mut con, &mut svc, "bind 3 -"), ["OK pump 3 -> nothing"]);

    let table = run(&mut con, &mut svc, "pumps");
    assert_eq!(table.len(), svc.registry().len());
    assert!(table[1].ends_with("soda-water"));
    assert!(table[2].ends_with(" -"));
    assert!(svc.ledger().peek("soda-water").is_some());
}

#[test]
fn calibrate_and_measure_over_the_console() {
    let nvs = NvsAdapter::default();
    let mut svc = factory_service(&nvs);
    let mut con = console();

    assert_eq!(
        run(&mut con, &mut svc, "calibrate 4"),
        ["OK pump 4 ran 2000 ms, now 'measure 4 <ml>'"]
    );
    assert_eq!(run(&mut con, &mut svc, "measure 4 60"), ["OK pump 4 flow 30.00 mL/s"]);
}

#[test]
fn clean_reports_flush_count() {
    let nvs = NvsAdapter::default();
    let mut svc = factory_service(&nvs);
    let mut con = console();

    let reply = run(&mut con, &mut svc, "clean");
    assert_eq!(
        reply,
        [format!("OK cleaning complete: {} flushed, 0 failed", svc.registry().len())]
    );
}

#[test]
fn menu_lists_the_builtin_catalog() {
    let nvs = NvsAdapter::default();
    let mut svc = factory_service(&nvs);
    let mut con = console();

    let menu = run(&mut con, &mut svc, "menu");
    assert_eq!(menu.len(), con.catalog().cocktails().len());
    assert!(menu.iter().any(|l| l.starts_with("screwdriver")));
}
