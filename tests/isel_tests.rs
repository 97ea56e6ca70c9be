//! Integration tests for Z80 instruction selection over textual DAGs.

use z80_isel::core::{IselError, IselSession, NodeId, SelectionStats, TypeContext};
use z80_isel::dag_text::parse_dag;
use z80_isel::isel::InstructionSelector;
use z80_isel::z80::{Arch, FeatureSet, PointerMode, Subtarget, TargetTriple, Z80Target};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn target(arch: Arch, features: FeatureSet) -> Z80Target {
    Z80Target::new(Subtarget::new(TargetTriple::new(arch), features).unwrap())
}

fn z80() -> Z80Target {
    target(Arch::Z80, FeatureSet::default())
}

/// Select `text` and return the printed result with the session statistics.
fn select(target: &Z80Target, text: &str) -> (Result<String, IselError>, SelectionStats) {
    init_logging();
    let ctx = TypeContext::new();
    let mut parsed = parse_dag(text, &ctx).unwrap_or_else(|e| panic!("bad test DAG: {e}"));
    let session = IselSession::new();
    let result = InstructionSelector::new(target, &session)
        .select_function(&mut parsed.dag, &parsed.order)
        .map(|()| parsed.dag.to_string());
    (result, session.stats())
}

fn select_ok(target: &Z80Target, text: &str) -> String {
    select(target, text)
        .0
        .unwrap_or_else(|e| panic!("selection failed: {e}\n{text}"))
}

fn check_output_contains(output: &str, patterns: &[&str]) {
    for pattern in patterns {
        assert!(
            output.contains(pattern),
            "Output missing expected pattern: '{pattern}'\nFull output:\n{output}"
        );
    }
}

const ADD_IMM: &str = "\
t0: ch = EntryToken
t1: i8 = Register<1>
t2: i8 = Constant<5>
t3: i8 = add t1, t2
t4: ch = ret t0, t3
root t4
";

#[test]
fn test_add_immediate() {
    let (result, stats) = select(&z80(), ADD_IMM);
    assert_eq!(
        result.unwrap(),
        "t0: ch = EntryToken\n\
         t1: i8 = Register<1>\n\
         t2: i8 = TargetConstant<5>\n\
         t3: i8 = ADD8ai t1, t2\n\
         t4: ch = RET t0, t3\n\
         root t4\n"
    );
    assert_eq!(stats.functions_selected, 1);
    assert_eq!(stats.nodes_selected, 2);
    assert_eq!(stats.nodes_passed_through, 2);
    assert_eq!(stats.nodes_dead, 1);
    assert_eq!(stats.pattern_hits.get("ADD8ai"), Some(&1));
    assert_eq!(stats.pattern_hits.get("RET_value"), Some(&1));
}

#[test]
fn test_selected_dag_is_left_alone() {
    let once = select_ok(&z80(), ADD_IMM);
    let (again, stats) = select(&z80(), &once);
    assert_eq!(again.unwrap(), once);
    assert_eq!(stats.nodes_preselected, 2);
    assert_eq!(stats.nodes_selected, 0);
    assert_eq!(stats.nodes_passed_through, 3);
}

#[test]
fn test_increment_beats_immediate_add() {
    let text = ADD_IMM.replace("Constant<5>", "Constant<1>");
    let output = select_ok(&z80(), &text);
    check_output_contains(&output, &["t2: i8 = INC8r t1", "RET t0, t2"]);
    assert!(!output.contains("Constant"));

    let text = ADD_IMM.replace("Constant<5>", "Constant<-1>");
    check_output_contains(&select_ok(&z80(), &text), &["DEC8r t1"]);
    let text = ADD_IMM.replace("Constant<5>", "Constant<255>");
    check_output_contains(&select_ok(&z80(), &text), &["DEC8r t1"]);
}

#[test]
fn test_register_operands() {
    let text = "\
t0: ch = EntryToken
t1: i16 = Register<1>
t2: i16 = Register<2>
t3: i16 = sub t1, t2
t4: ch = ret t0, t3
root t4
";
    check_output_contains(&select_ok(&z80(), text), &["t3: i16 = SBC16aa t1, t2"]);
}

#[test]
fn test_unsupported_operation_is_no_match() {
    let text = "\
t0: ch = EntryToken
t1: i8 = Register<1>
t2: i8 = Register<2>
t3: i8 = sdiv t1, t2
t4: ch = ret t0, t3
root t4
";
    let (result, stats) = select(&z80(), text);
    let err = result.unwrap_err();
    assert_eq!(
        err,
        IselError::NoMatch {
            node: NodeId(3),
            description: "t3: i8 = sdiv t1, t2".to_string(),
        }
    );
    assert_eq!(err.to_string(), "Cannot select: t3: i8 = sdiv t1, t2");
    assert!(err.is_no_match());
    assert_eq!(stats.functions_selected, 0);
}

const MUL: &str = "\
t0: ch = EntryToken
t1: i8 = Register<1>
t2: i8 = Register<2>
t3: i8 = mul t1, t2
t4: ch = ret t0, t3
root t4
";

#[test]
fn test_multiply_needs_mlt() {
    assert!(select(&z80(), MUL).0.unwrap_err().is_no_match());

    let z180 = target(
        Arch::Z80,
        FeatureSet {
            z180_ops: true,
            ..FeatureSet::default()
        },
    );
    check_output_contains(&select_ok(&z180, MUL), &["t3: i8 = MLT8rr t1, t2"]);

    let ez80 = target(Arch::EZ80, FeatureSet::default());
    check_output_contains(&select_ok(&ez80, MUL), &["MLT8rr t1, t2"]);
}

const SLL: &str = "\
t0: ch = EntryToken
t1: i8 = Register<1>
t2: i8 = Constant<1>
t3: i8 = shl t1, t2
t4: i8 = or t3, t2
t5: ch = ret t0, t4
root t5
";

#[test]
fn test_sll_with_undocumented_ops() {
    let undoc = target(
        Arch::Z80,
        FeatureSet {
            undoc_ops: true,
            ..FeatureSet::default()
        },
    );
    let (result, stats) = select(&undoc, SLL);
    assert_eq!(
        result.unwrap(),
        "t0: ch = EntryToken\n\
         t1: i8 = Register<1>\n\
         t2: i8 = SLL8r t1\n\
         t3: ch = RET t0, t2\n\
         root t3\n"
    );
    assert_eq!(stats.nodes_dead, 2);
}

#[test]
fn test_sll_falls_back_without_undocumented_ops() {
    let output = select_ok(&z80(), SLL);
    check_output_contains(&output, &["SLA8r t1", "OR8ai"]);
    assert!(!output.contains("SLL8r"));
}

const LOAD_GLOBAL: &str = "\
t0: ch = EntryToken
t1: i16 = GlobalAddress<@counter>
t2: i8,ch = load t0, t1
t3: ch = ret t2:1, t2
root t3
";

#[test]
fn test_absolute_load() {
    assert_eq!(
        select_ok(&z80(), LOAD_GLOBAL),
        "t0: ch = EntryToken\n\
         t1: i16 = TargetGlobalAddress<@counter>\n\
         t2: i8,ch = LD8am t0, t1\n\
         t3: ch = RET t2:1, t2\n\
         root t3\n"
    );
}

#[test]
fn test_indexed_load_folds_constant_offset() {
    let text = "\
t0: ch = EntryToken
t1: i16 = Register<2>
t2: i16 = Constant<4>
t3: i16 = add t1, t2
t4: i8,ch = load t0, t3
t5: ch = ret t4:1, t4
root t5
";
    let (result, stats) = select(&z80(), text);
    assert_eq!(
        result.unwrap(),
        "t0: ch = EntryToken\n\
         t1: i16 = Register<2>\n\
         t2: i16 = TargetConstant<4>\n\
         t3: i8,ch = LD8go t0, t1, t2\n\
         t4: ch = RET t3:1, t3\n\
         root t4\n"
    );
    assert_eq!(stats.nodes_dead, 2);
}

#[test]
fn test_frame_load_uses_zero_offset() {
    let text = "\
t0: ch = EntryToken
t1: i16 = FrameIndex<2>
t2: i8,ch = load t0, t1
t3: ch = ret t2:1, t2
root t3
";
    assert_eq!(
        select_ok(&z80(), text),
        "t0: ch = EntryToken\n\
         t1: i16 = TargetFrameIndex<2>\n\
         t2: i8 = TargetConstant<0>\n\
         t3: i8,ch = LD8go t0, t1, t2\n\
         t4: ch = RET t3:1, t3\n\
         root t4\n"
    );
}

#[test]
fn test_indirect_load() {
    let text = "\
t0: ch = EntryToken
t1: i16 = Register<2>
t2: i16,ch = load t0, t1
t3: ch = ret t2:1, t2
root t3
";
    check_output_contains(&select_ok(&z80(), text), &["t2: i16,ch = LD16gp t0, t1"]);
}

#[test]
fn test_stores() {
    let text = "\
t0: ch = EntryToken
t1: i8 = Register<1>
t2: i16 = ExternalSymbol<'port'>
t3: ch = store t0, t1, t2
t4: ch = ret t3
root t4
";
    assert_eq!(
        select_ok(&z80(), text),
        "t0: ch = EntryToken\n\
         t1: i8 = Register<1>\n\
         t2: i16 = TargetExternalSymbol<'port'>\n\
         t3: ch = LD8ma t0, t1, t2\n\
         t4: ch = RET t3\n\
         root t4\n"
    );

    // A stored constant is materialized; the address is folded.
    let text = "\
t0: ch = EntryToken
t1: i16 = Constant<-2>
t2: i16 = FrameIndex<0>
t3: ch = store t0, t1, t2
t4: ch = ret t3
root t4
";
    check_output_contains(
        &select_ok(&z80(), text),
        &["i16 = LD16ri", "TargetFrameIndex<0>", "LD16og"],
    );
}

const FRAME_ADDRESS: &str = "\
t0: ch = EntryToken
t1: i16 = FrameIndex<3>
t2: ch = ret t0, t1
root t2
";

#[test]
fn test_frame_address_materialization() {
    let output = select_ok(&z80(), FRAME_ADDRESS);
    check_output_contains(
        &output,
        &["TargetFrameIndex<3>", "TargetConstant<0>", "ADD16fi"],
    );

    let ez80_short = target(
        Arch::Z80,
        FeatureSet {
            ez80_ops: true,
            mode: Some(PointerMode::Bits16),
            ..FeatureSet::default()
        },
    );
    let output = select_ok(&ez80_short, FRAME_ADDRESS);
    check_output_contains(&output, &["LEA16ro"]);
    assert!(!output.contains("ADD16fi"));

    let ez80 = target(Arch::EZ80, FeatureSet::default());
    let text = FRAME_ADDRESS.replace("i16", "i24");
    check_output_contains(
        &select_ok(&ez80, &text),
        &["t1: i24 = TargetFrameIndex<3>", "LEA24ro"],
    );
}

#[test]
fn test_24bit_mode() {
    let text = LOAD_GLOBAL
        .replace("i16 = GlobalAddress<@counter>", "i24 = GlobalAddress<@buf+3>")
        .replace("i8,ch", "i24,ch");

    let ez80 = target(Arch::EZ80, FeatureSet::default());
    check_output_contains(
        &select_ok(&ez80, &text),
        &["t1: i24 = TargetGlobalAddress<@buf+3>", "i24,ch = LD24am t0, t1"],
    );

    let err = select(&z80(), &text).0.unwrap_err();
    assert!(err.is_no_match(), "{err}");
    assert_eq!(
        err,
        IselError::IllegalType {
            node: NodeId(2),
            ty: "i24".to_string(),
            description: "t2: i24,ch = load t0, t1".to_string(),
        }
    );
    assert_eq!(
        err.to_string(),
        "Cannot select: t2: i24,ch = load t0, t1: i24 is not a legal type for this target"
    );
}

#[test]
fn test_legal_type_without_pattern_stays_no_match() {
    let text = "\
t0: ch = EntryToken
t1: i16 = Register<1>
t2: i16 = Register<2>
t3: i16 = mul t1, t2
t4: ch = ret t0, t3
root t4
";
    let ez80 = target(Arch::EZ80, FeatureSet::default());
    for t in [z80(), ez80] {
        let err = select(&t, text).0.unwrap_err();
        assert!(matches!(err, IselError::NoMatch { node: NodeId(3), .. }), "{err}");
    }
}

#[test]
fn test_unused_nodes_are_dropped() {
    let text = "\
t0: ch = EntryToken
t1: i8 = Constant<9>
t2: i8 = Constant<3>
t3: i8 = add t1, t2
t4: ch = ret t0
root t4
";
    let (result, stats) = select(&z80(), text);
    assert_eq!(
        result.unwrap(),
        "t0: ch = EntryToken\nt1: ch = RET t0\nroot t1\n"
    );
    assert_eq!(stats.nodes_dead, 3);
    assert_eq!(stats.pattern_hits.get("RET"), Some(&1));
}

#[test]
fn test_order_must_cover_the_dag() {
    init_logging();
    let target = z80();
    let ctx = TypeContext::new();
    let session = IselSession::new();
    let selector = InstructionSelector::new(&target, &session);

    let mut parsed = parse_dag(ADD_IMM, &ctx).unwrap();
    let partial: Vec<_> = parsed
        .order
        .iter()
        .copied()
        .filter(|&id| id != NodeId(1))
        .collect();
    let err = selector
        .select_function(&mut parsed.dag, &partial)
        .unwrap_err();
    assert_eq!(err, IselError::Unvisited { node: NodeId(1) });

    let mut parsed = parse_dag(ADD_IMM, &ctx).unwrap();
    let mut bogus = parsed.order.clone();
    bogus.push(NodeId(99));
    let err = selector
        .select_function(&mut parsed.dag, &bogus)
        .unwrap_err();
    assert_eq!(err, IselError::InvalidOrder { node: NodeId(99) });

    assert_eq!(session.stats().functions_selected, 0);
    assert!(session.current_function().is_none());
}

#[test]
fn test_duplicate_order_entries_are_ignored() {
    init_logging();
    let target = z80();
    let ctx = TypeContext::new();
    let session = IselSession::new();
    let mut parsed = parse_dag(ADD_IMM, &ctx).unwrap();
    let doubled: Vec<_> = parsed.order.iter().chain(&parsed.order).copied().collect();
    InstructionSelector::new(&target, &session)
        .select_function(&mut parsed.dag, &doubled)
        .unwrap();
    assert_eq!(parsed.dag.to_string(), select_ok(&z80(), ADD_IMM));
}

#[test]
fn test_statistics_accumulate_over_functions() {
    init_logging();
    let target = z80();
    let ctx = TypeContext::new();
    let session = IselSession::new();
    let selector = InstructionSelector::new(&target, &session);
    for name in ["f", "g"] {
        let mut parsed = parse_dag(ADD_IMM, &ctx).unwrap();
        selector
            .select_named_function(name, &mut parsed.dag, &parsed.order)
            .unwrap();
    }
    let mut parsed = parse_dag(MUL, &ctx).unwrap();
    assert!(selector
        .select_named_function("h", &mut parsed.dag, &parsed.order)
        .is_err());

    let stats = session.stats();
    assert_eq!(stats.functions_selected, 2);
    assert_eq!(stats.pattern_hits.get("ADD8ai"), Some(&2));
    let report = stats.to_string();
    check_output_contains(
        &report,
        &["Instruction Selection Statistics:", "Functions selected: 2", "ADD8ai: 2"],
    );
}

#[test]
fn test_inline_asm_memory_operand_is_unimplemented() {
    let target = z80();
    let ctx = TypeContext::new();
    let session = IselSession::new();
    let parsed = parse_dag(FRAME_ADDRESS, &ctx).unwrap();
    let addr = parsed.node("t1").unwrap();
    let err = InstructionSelector::new(&target, &session)
        .select_inline_asm_memory_operand(&parsed.dag, addr.into(), 'm')
        .unwrap_err();
    assert_eq!(
        err,
        IselError::Unimplemented {
            operation: "inline asm memory operand selection"
        }
    );
    assert!(!err.is_no_match());
}

#[test]
fn test_concurrent_selection_is_deterministic() {
    init_logging();
    let target = target(
        Arch::Z80,
        FeatureSet {
            undoc_ops: true,
            ..FeatureSet::default()
        },
    );
    let ctx = TypeContext::new();
    // An unused extended-type node shares the context across threads.
    let text = SLL.replace(
        "t5: ch = ret t0, t4",
        "t6: i40 = Register<9>\nt5: ch = ret t0, t4",
    );
    let expected = select_ok(&target, &text);

    let (target, ctx, text) = (&target, &ctx, text.as_str());
    let outputs: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(move || {
                    let session = IselSession::new();
                    let selector = InstructionSelector::new(target, &session);
                    (0..16)
                        .map(|_| {
                            let mut parsed = parse_dag(text, ctx).unwrap();
                            selector
                                .select_function(&mut parsed.dag, &parsed.order)
                                .unwrap();
                            parsed.dag.to_string()
                        })
                        .last()
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for output in outputs {
        assert_eq!(output, expected);
    }
    assert_eq!(ctx.len(), 1);
}
