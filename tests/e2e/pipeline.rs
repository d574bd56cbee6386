//! Full-stack scenarios: TOML program text through load, validation and
//! evaluation against crafted frames.

use crate::{make_packet, make_tcp_frame};
use pipevm::Error;
use pipevm::eval::Evaluator;
use pipevm::packet::Packet;
use pipevm::program::{self, Program};
use std::sync::Arc;
use std::time::SystemTime;

fn load_program(text: &str) -> Arc<Program> {
    let loaded = program::parse(text).expect("program should parse");
    let validation = program::validate(&loaded);
    assert!(
        !validation.has_errors(),
        "program should validate: {:?}",
        validation.errors
    );
    Arc::new(loaded)
}

/// The TCP destination port sits 22 bytes past the IPv4 header start:
/// 20 bytes of IPv4 header plus the 2-byte source port.
const PORT_MATCH: &str = r#"
    [[tables]]
    name = "ingress"
    prep = [
        { kind = "copy", src = { space = "header", pos = 176, width = 16 }, dst = { space = "key", pos = 0, width = 16 }, width = 16 },
        { kind = "match" },
    ]

    [[tables.rules]]
    key = { scalar = 0x50 }
    actions = [{ kind = "output", port = 3 }]

    [[tables.rules]]
    key = "any"
    actions = [{ kind = "drop" }]
"#;

#[test]
fn test_port_match_program_outputs() {
    let program = load_program(PORT_MATCH);

    let packet = make_packet(40000, 0x50);
    let mut eval = Evaluator::new(Arc::clone(&program), &packet).unwrap();
    eval.run().unwrap();
    assert_eq!(eval.decision().output_port(), Some(3));
}

#[test]
fn test_port_match_program_drops_everything_else() {
    let program = load_program(PORT_MATCH);

    for dst_port in [22, 443, 8080] {
        let packet = make_packet(40000, dst_port);
        let mut eval = Evaluator::new(Arc::clone(&program), &packet).unwrap();
        eval.run().unwrap();
        assert!(
            eval.decision().is_dropped(),
            "dst port {} should be dropped",
            dst_port
        );
    }
}

#[test]
fn test_goto_chain_across_tables() {
    // A matched rule defers to a second table whose preparation emits the
    // packet; the goto runs during egress with a drained queue.
    let text = r#"
        [[tables]]
        name = "classify"
        prep = [
            { kind = "copy", src = { space = "header", pos = 176, width = 16 }, dst = { space = "key", pos = 0, width = 16 }, width = 16 },
            { kind = "match" },
        ]

        [[tables.rules]]
        key = { port = 80 }
        actions = [{ kind = "goto", table = "emit" }]

        [[tables.rules]]
        key = "any"
        actions = [{ kind = "drop" }]

        [[tables]]
        name = "emit"
        prep = [{ kind = "output", port = 12 }]
    "#;
    let program = load_program(text);

    let packet = make_packet(40000, 80);
    let mut eval = Evaluator::new(Arc::clone(&program), &packet).unwrap();
    eval.run().unwrap();
    assert_eq!(eval.decision().output_port(), Some(12));

    let packet = make_packet(40000, 23);
    let mut eval = Evaluator::new(program, &packet).unwrap();
    eval.run().unwrap();
    assert!(eval.decision().is_dropped());
}

#[test]
fn test_drop_cancels_accumulated_egress() {
    let text = r#"
        [[tables]]
        name = "ingress"
        prep = [{ kind = "match" }, { kind = "drop" }]

        [[tables.rules]]
        key = "any"
        actions = [{ kind = "output", port = 9 }]
    "#;
    let program = load_program(text);

    let packet = make_packet(1234, 80);
    let mut eval = Evaluator::new(program, &packet).unwrap();
    eval.run().unwrap();
    assert!(eval.decision().is_dropped());
}

#[test]
fn test_goto_cycle_hits_step_budget() {
    let text = r#"
        [[tables]]
        name = "spin"
        prep = [{ kind = "goto", table = "spin" }]
    "#;
    let program = load_program(text);

    let packet = make_packet(1234, 80);
    let mut eval = Evaluator::new(program, &packet).unwrap();
    let err = eval.run_bounded(100).unwrap_err();
    assert!(matches!(err, Error::StepBudgetExceeded { budget: 100 }));
}

#[test]
fn test_header_rewrite_lands_in_working_buffer_only() {
    // Zero checksum bytes in the frame give the deposit a clean range.
    let text = r#"
        [[tables]]
        name = "rewrite"
        prep = [
            { kind = "set", field = { space = "header", pos = 80, width = 16 }, value = 0xBEEF, width = 16 },
            { kind = "output", port = 1 },
        ]
    "#;
    let program = load_program(text);

    let packet = make_packet(1234, 80);
    let mut eval = Evaluator::new(program, &packet).unwrap();
    eval.run().unwrap();

    let (buffer, decision) = eval.into_output();
    assert_eq!(decision.output_port(), Some(1));
    // IPv4 checksum field: header bytes 10-11.
    assert_eq!(&buffer[24..26], &[0xBE, 0xEF]);
    assert_eq!(&packet.data()[24..26], &[0x00, 0x00]);
    // Everything else is byte-identical to the original.
    assert_eq!(&buffer[..24], &packet.data()[..24]);
    assert_eq!(&buffer[26..], &packet.data()[26..]);
}

#[test]
fn test_write_and_clear_inside_a_loaded_program() {
    // clear abandons the queued output; the deferred one never survives it.
    let text = r#"
        [[tables]]
        name = "ingress"
        prep = [
            { kind = "write", action = { kind = "output", port = 5 } },
            { kind = "clear" },
        ]
    "#;
    let program = load_program(text);

    let packet = make_packet(1234, 80);
    let mut eval = Evaluator::new(program, &packet).unwrap();
    eval.run().unwrap();
    assert!(eval.decision().is_dropped());
}

#[test]
fn test_validation_reports_bad_copy() {
    let text = r#"
        [[tables]]
        name = "broken"
        prep = [
            { kind = "copy", src = { space = "key", pos = 0, width = 16 }, dst = { space = "packet", pos = 0, width = 16 }, width = 16 },
        ]
    "#;
    let loaded = program::parse(text).unwrap();
    let validation = program::validate(&loaded);
    assert!(validation.has_errors());
}

#[test]
fn test_load_rejects_unknown_goto_target() {
    let text = r#"
        [[tables]]
        name = "ingress"
        prep = [{ kind = "goto", table = "missing" }]
    "#;
    let err = program::parse(text).unwrap_err();
    assert!(matches!(err, Error::UnknownTable(name) if name == "missing"));
}

#[test]
fn test_classification_rejects_non_tcp_before_evaluation() {
    let mut data = make_tcp_frame(1234, 80);
    data[14 + 9] = 17; // UDP
    let err = Packet::classify(data, SystemTime::UNIX_EPOCH, 0).unwrap_err();
    assert!(matches!(err, Error::UnsupportedProtocol(_)));
}

#[test]
fn test_shared_program_across_threads() {
    // One frozen program, independent evaluators on separate threads.
    let program = load_program(PORT_MATCH);

    std::thread::scope(|scope| {
        let mut handles = Vec::new();
        for (dst_port, expected) in [(0x50u16, Some(3u16)), (443, None), (0x50, Some(3))] {
            let program = Arc::clone(&program);
            handles.push(scope.spawn(move || {
                let packet = make_packet(55555, dst_port);
                let mut eval = Evaluator::new(program, &packet).unwrap();
                eval.run().unwrap();
                assert_eq!(eval.decision().output_port(), expected);
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
    });
}
