//! End-to-end mining scenarios: method bodies in, consolidated patterns out.

use schaapi_rs::core::config::{MiningConfig, NormalizationConfig};
use schaapi_rs::mining::consolidator::is_sub_template;
use schaapi_rs::{
    Corpus, CorpusEntry, EdgeKind, GraphBuilder, GraphNormalizer, Instruction, LibrarySurface,
    MethodRef, Pattern, PatternConsolidator, PatternMiner,
};

const NEW_LIST: &str = "java.util.ArrayList.<init>()";
const ADD: &str = "java.util.List.add(java.lang.Object)";

fn list_with_adds(var: &str, adds: usize) -> Vec<Instruction> {
    let mut body = vec![Instruction::construct(NEW_LIST).with_result(var)];
    for n in 0..adds {
        body.push(
            Instruction::invoke(ADD)
                .with_local(var)
                .with_constant(n.to_string()),
        );
    }
    body.push(Instruction::new(schaapi_rs::InstructionKind::Return));
    body
}

fn corpus(methods: &[(&str, &str, Vec<Instruction>)]) -> Corpus {
    let builder = GraphBuilder::new(LibrarySurface::new(["java.util"]));
    let normalizer = GraphNormalizer::default();
    let entries = methods
        .iter()
        .map(|(project, method, body)| {
            let graph = builder.build(body).unwrap();
            CorpusEntry::new(
                MethodRef::new(*project, *method),
                normalizer.normalize(&graph).unwrap(),
            )
        })
        .collect();
    let projects: Vec<&str> = methods.iter().map(|(project, _, _)| *project).collect();
    Corpus::new(projects, entries)
}

fn mine_raw(corpus: &Corpus, min_support: usize, parallel: bool) -> Vec<Pattern> {
    PatternMiner::new(
        MiningConfig {
            min_support,
            ..MiningConfig::default()
        },
        NormalizationConfig::default(),
    )
    .with_parallelism(parallel)
    .mine(corpus)
    .unwrap()
    .patterns
}

fn mine(corpus: &Corpus, min_support: usize) -> Vec<Pattern> {
    PatternConsolidator::new().consolidate(mine_raw(corpus, min_support, true))
}

fn sorted_symbols(pattern: &Pattern) -> Vec<&str> {
    let mut symbols = pattern.symbols();
    symbols.sort_unstable();
    symbols
}

#[test]
fn construct_then_two_adds_in_every_project() {
    let corpus = corpus(&[
        ("p1", "a.Main.run()", list_with_adds("list", 2)),
        ("p2", "b.Main.run()", list_with_adds("items", 2)),
        ("p3", "c.Main.run()", list_with_adds("l", 2)),
    ]);

    let patterns = mine(&corpus, 3);

    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].node_count(), 3);
    assert_eq!(patterns[0].support, 3);
    assert_eq!(sorted_symbols(&patterns[0]), vec![NEW_LIST, ADD, ADD]);
}

#[test]
fn single_add_in_one_project_keeps_only_the_pair() {
    let corpus = corpus(&[
        ("p1", "a.Main.run()", list_with_adds("list", 2)),
        ("p2", "b.Main.run()", list_with_adds("list", 2)),
        ("p3", "c.Main.run()", list_with_adds("list", 1)),
    ]);

    let patterns = mine(&corpus, 3);

    assert_eq!(patterns.len(), 1);
    let pair = &patterns[0];
    assert_eq!(pair.node_count(), 2);
    assert_eq!(pair.support, 3);
    assert_eq!(sorted_symbols(pair), vec![NEW_LIST, ADD]);
    let kinds: Vec<EdgeKind> = pair.edges.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EdgeKind::Control, EdgeKind::Data]);
}

#[test]
fn disjoint_usage_in_two_projects_yields_nothing() {
    let open_close = vec![
        Instruction::invoke("java.util.zip.ZipFile.open()").with_result("z"),
        Instruction::invoke("java.util.zip.ZipFile.close()").with_local("z"),
    ];
    let lock_unlock = vec![
        Instruction::invoke("java.util.concurrent.Lock.lock()"),
        Instruction::invoke("java.util.concurrent.Lock.unlock()"),
    ];
    let corpus = corpus(&[
        ("p1", "a.Main.run()", open_close),
        ("p2", "b.Main.run()", lock_unlock),
    ]);

    assert!(mine(&corpus, 2).is_empty());
}

#[test]
fn corpus_without_library_usage_is_not_an_error() {
    let body = vec![
        Instruction::invoke("com.acme.Util.helper()").with_result("x"),
        Instruction::new(schaapi_rs::InstructionKind::Return),
    ];
    let corpus = corpus(&[("p1", "a.Main.run()", body.clone()), ("p2", "b.Main.run()", body)]);

    assert!(corpus.is_empty());
    assert_eq!(corpus.project_count(), 2);
    assert!(mine(&corpus, 2).is_empty());
}

#[test]
fn iterator_loop_pattern_keeps_its_loop_back_edge() {
    let iterate = |list: &str, it: &str| {
        vec![
            Instruction::invoke("java.util.List.iterator()")
                .with_local(list)
                .with_result(it),
            Instruction::invoke("java.util.Iterator.hasNext()")
                .with_local(it)
                .with_result("more"),
            Instruction::branch(5).with_local("more"),
            Instruction::invoke("java.util.Iterator.next()")
                .with_local(it)
                .with_result("item"),
            Instruction::goto(1),
            Instruction::new(schaapi_rs::InstructionKind::Return),
        ]
    };
    let corpus = corpus(&[
        ("p1", "a.Main.scan(java.util.List)", iterate("xs", "i")),
        ("p2", "b.Main.scan(java.util.List)", iterate("values", "cursor")),
    ]);

    let patterns = mine(&corpus, 2);

    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].node_count(), 3);
    assert!(patterns[0]
        .edges
        .iter()
        .any(|edge| edge.kind == EdgeKind::LoopBack));
}

#[test]
fn repeated_runs_give_identical_output() {
    let corpus = corpus(&[
        ("p1", "a.Main.run()", list_with_adds("list", 3)),
        ("p1", "a.Main.other()", list_with_adds("list", 1)),
        ("p2", "b.Main.run()", list_with_adds("list", 2)),
        ("p3", "c.Main.run()", list_with_adds("list", 2)),
    ]);

    let first = mine(&corpus, 2);
    let second = mine(&corpus, 2);
    let sequential = PatternConsolidator::new().consolidate(mine_raw(&corpus, 2, false));

    assert!(!first.is_empty());
    assert_eq!(first, second);
    assert_eq!(first, sequential);
}

#[test]
fn consolidated_patterns_are_not_subsumed() {
    let corpus = corpus(&[
        ("p1", "a.Main.run()", list_with_adds("list", 3)),
        ("p2", "b.Main.run()", list_with_adds("list", 2)),
        ("p3", "c.Main.run()", list_with_adds("list", 1)),
        ("p4", "d.Main.run()", list_with_adds("list", 2)),
    ]);

    let patterns = mine(&corpus, 2);
    assert!(patterns.len() >= 2);

    for p in &patterns {
        for q in &patterns {
            let larger = q.node_count() > p.node_count()
                || (q.node_count() == p.node_count() && q.edge_count() > p.edge_count());
            if larger && q.support >= p.support {
                assert!(
                    !is_sub_template(p, q),
                    "{} is subsumed by {}",
                    p.label,
                    q.label
                );
            }
        }
    }
    assert!(patterns
        .windows(2)
        .all(|w| w[0].support >= w[1].support));
}
