use console::sprite::BUILTIN_SPRITE;
use console::{
    ConsoleConfig, GuestError, HeadlessDisplay, IdleInput, InputState, Scheduler, SchedulerState,
    ScriptedInput,
};
use vm::RuntimeError;

fn config() -> ConsoleConfig {
    ConsoleConfig {
        fps: 0,
        random_seed: Some(3),
        ..Default::default()
    }
}

fn console_with(config: ConsoleConfig, source: &str) -> Scheduler<HeadlessDisplay, IdleInput> {
    let mut s = Scheduler::new(config, HeadlessDisplay::new(), IdleInput);
    assert_eq!(s.state(), SchedulerState::Init);
    s.load_source(source);
    s
}

fn console(source: &str) -> Scheduler<HeadlessDisplay, IdleInput> {
    console_with(config(), source)
}

#[test]
fn disallowed_cartridge_never_calls_entry_points() {
    let mut s = console("import os\nfn setup() { print(\"setup ran\") }\nfn update() { print(\"tick\") }");
    assert!(matches!(s.guest_errors()[0], GuestError::Syntax(_)));
    assert_eq!(s.state(), SchedulerState::Running);

    let report = s.tick().unwrap();
    assert!(report.output.is_empty());
    assert!(report.presented);
    assert!(s.context().framebuffer().pixels().iter().all(|&p| p == 0));
}

#[test]
fn quit_during_update_shuts_down_that_tick() {
    let mut s = console("fn update() { print(\"bye\")\n quit() }");
    let report = s.tick().unwrap();
    assert_eq!(s.state(), SchedulerState::Shutdown);
    assert_eq!(report.output, vec!["bye"]);
    assert!(!report.presented);
    assert!(s.display().is_closed());
    assert_eq!(s.display().frames_presented(), 0);

    // Further ticks do nothing.
    assert_eq!(s.tick().unwrap().tick, 1);
}

#[test]
fn failing_update_recovers_next_tick() {
    let src = "mut n = 0\nfn update() {\n n = n + 1\n if n == 2 { 1 / 0 }\n print(n)\n}";
    let mut s = console(src);

    assert_eq!(s.tick().unwrap().output, vec!["1"]);
    let second = s.tick().unwrap();
    assert!(second.update_failed);
    assert!(second.output.is_empty());
    let third = s.tick().unwrap();
    assert!(!third.update_failed);
    assert_eq!(third.output, vec!["3"]);

    match &s.guest_errors()[0] {
        GuestError::FrameRuntime {
            entry,
            tick,
            location,
            source,
        } => {
            assert_eq!(*entry, "update");
            assert_eq!(*tick, 2);
            assert_eq!(*source, RuntimeError::DivisionByZero);
            let location = location.as_ref().unwrap();
            assert_eq!(location.function, "update");
            assert_eq!(location.line, 4);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn setup_only_cartridge_keeps_presenting() {
    let cfg = ConsoleConfig {
        max_ticks: Some(5),
        ..config()
    };
    let mut s = console_with(cfg, "mut ready = false\nfn setup() { ready = true\n print(\"ready\") }");
    let summary = s.run().unwrap();
    assert_eq!(summary.ticks, 5);
    assert_eq!(summary.guest_errors, 0);
    assert_eq!(s.display().frames_presented(), 5);
    assert_eq!(s.state(), SchedulerState::Shutdown);
}

#[test]
fn setup_errors_do_not_stop_loading() {
    let mut s = console("fn setup() { nope() }\nfn update() { print(\"still here\") }");
    assert!(matches!(s.guest_errors()[0], GuestError::LoadRuntime { .. }));
    assert_eq!(s.tick().unwrap().output, vec!["still here"]);
}

#[test]
fn draw_then_print() {
    let mut s = console("fn update() { draw_sprite(0, 0)\n print(\"hello\") }");
    let report = s.tick().unwrap();
    assert!(report.output.iter().any(|l| l.contains("hello")));

    let fb = s.context().framebuffer();
    for (r, row) in BUILTIN_SPRITE.iter().enumerate() {
        for (c, &index) in row.iter().enumerate() {
            assert_eq!(fb.get(c, r), Some(index));
        }
    }
    // Sprite cell (2, 0) is white; horizontal scale is 5.
    assert_eq!(s.display().pixel(10, 0), Some([255, 255, 255]));
    assert_eq!(s.display().pixel(0, 0), Some([0, 0, 0]));
}

#[test]
fn framebuffer_is_cleared_every_tick() {
    let src = "mut first = true\nfn update() { if first { draw_sprite(0, 0) }\n first = false }";
    let mut s = console(src);
    s.tick().unwrap();
    assert_eq!(s.context().framebuffer().get(2, 0), Some(1));
    s.tick().unwrap();
    assert_eq!(s.context().framebuffer().get(2, 0), Some(0));
}

#[test]
fn input_snapshot_is_visible_to_update() {
    let pressed = InputState {
        left: true,
        ..Default::default()
    };
    let mut s = Scheduler::new(config(), HeadlessDisplay::new(), ScriptedInput::new([pressed]));
    s.load_source("fn update() { let i = get_input()\n print(i[\"left\"], i[\"a\"]) }");
    assert_eq!(s.tick().unwrap().output, vec!["true false"]);
    assert_eq!(s.tick().unwrap().output, vec!["false false"]);
}

#[test]
fn display_close_request_ends_the_run() {
    let mut s = Scheduler::new(config(), HeadlessDisplay::new().quit_after(3), IdleInput);
    s.load_source("fn update() { }");
    let summary = s.run().unwrap();
    assert_eq!(summary.ticks, 4);
    assert_eq!(s.display().frames_presented(), 3);
}

#[test]
fn instruction_budget_contains_runaway_update() {
    let cfg = ConsoleConfig {
        instruction_budget: Some(10_000),
        ..config()
    };
    let mut s = console_with(cfg, "mut n = 0\nfn update() { n = n + 1\n if n == 1 { forever { } }\n print(n) }");
    assert!(s.tick().unwrap().update_failed);
    assert_eq!(s.tick().unwrap().output, vec!["2"]);
    assert!(matches!(
        &s.guest_errors()[0],
        GuestError::FrameRuntime {
            source: RuntimeError::BudgetExhausted(10_000),
            ..
        }
    ));
}

#[test]
fn top_level_failure_keeps_earlier_bindings() {
    let mut s = console("fn update() { print(\"ok\") }\nlet x = [1][0] + nil");
    assert!(matches!(s.guest_errors()[0], GuestError::LoadRuntime { .. }));
    assert_eq!(s.tick().unwrap().output, vec!["ok"]);
}

#[test]
fn load_path_reads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("game.cart"), "fn update() { print(\"disk\") }").unwrap();

    let mut s = Scheduler::new(config(), HeadlessDisplay::new(), IdleInput);
    s.load_path(&dir.path().join("game")).unwrap();
    assert_eq!(s.tick().unwrap().output, vec!["disk"]);

    let mut missing = Scheduler::new(config(), HeadlessDisplay::new(), IdleInput);
    assert!(missing.load_path(&dir.path().join("nope")).is_err());
    assert_eq!(missing.state(), SchedulerState::Init);
}

#[test]
fn host_quit_shuts_down() {
    let mut s = console("fn update() { }");
    s.request_quit();
    assert_eq!(s.state(), SchedulerState::Shutdown);
    assert!(!s.tick().unwrap().presented);
}

#[test]
fn error_history_stays_bounded() {
    let mut s = console("fn update() { 1 / 0 }");
    for _ in 0..300 {
        assert!(s.tick().unwrap().update_failed);
    }
    assert_eq!(s.summary().guest_errors, 300);
    assert_eq!(s.guest_errors().len(), console::constants::RECENT_GUEST_ERRORS);
    assert!(matches!(
        s.guest_errors().back(),
        Some(GuestError::FrameRuntime { tick: 300, .. })
    ));
}

#[test]
fn dropping_a_deep_list_chain_survives() {
    let src = "mut x = nil\nfn update() {\n for i in 0..300000 { x = [x] }\n x = nil\n print(\"survived\")\n}";
    let mut s = console(src);
    assert_eq!(s.tick().unwrap().output, vec!["survived"]);
    assert_eq!(s.tick().unwrap().output, vec!["survived"]);
    assert!(s.guest_errors().is_empty());
}

#[test]
fn printing_a_list_that_holds_itself_twice_finishes() {
    let cfg = ConsoleConfig {
        instruction_budget: Some(100_000),
        ..config()
    };
    let mut s = console_with(cfg, "let l = []\npush(l, l)\npush(l, l)\nprint(l)\nprint(l == l)");
    assert_eq!(s.tick().unwrap().output, vec!["[[...], [...]]", "true"]);
}

#[test]
fn absurdly_nested_expression_is_a_syntax_error() {
    let n = 200_000;
    let src = format!("let x = {}1{}\nfn update() {{ print(\"tick\") }}", "(".repeat(n), ")".repeat(n));
    let mut s = console(&src);
    assert_eq!(s.guest_errors().len(), 1);
    assert!(matches!(s.guest_errors()[0], GuestError::Syntax(_)));
    assert!(s.tick().unwrap().output.is_empty());
}
