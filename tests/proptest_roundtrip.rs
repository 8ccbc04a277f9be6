//! Property tests for roundtrips: pretty -> parse and result encoding
//!
//! Printing a syntax tree and parsing the output must give the tree back;
//! encoding a relation or a report and decoding it must give it back.


use generators::*;
use mwp::algebra::{Matrix, Relation};
use mwp::analysis::analyze_body;
use mwp::pretty::{pretty_print, pretty_stmt};
use mwp::{parse, AnalysisOptions, FuncDef, Stmt};
use proptest::prelude::*;

fn reparse_stmt(stmt: &Stmt) -> Result<Stmt, String> {
    let printed = pretty_stmt(stmt);
    let program = parse(&format!("void f() {{\n{}\n}}", printed))
        .map_err(|e| format!("Reparse failed: {}\nPrinted: {}", e, printed))?;
    let body = &program.functions[0].node.body;
    match body.as_slice() {
        [single] => Ok(single.clone()),
        other => Err(format!("expected one statement, got {:?}\nPrinted: {}", other, printed)),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn stmt_roundtrip(stmt in arb_stmt()) {
        let reparsed = reparse_stmt(&stmt).map_err(TestCaseError::fail)?;
        prop_assert_eq!(reparsed, stmt);
    }

    #[test]
    fn program_roundtrip(program in arb_program()) {
        let printed = pretty_print(&program);
        let reparsed = parse(&printed)
            .map_err(|e| TestCaseError::fail(format!("{}\nPrinted: {}", e, printed)))?;
        let original: Vec<&FuncDef> = program.functions.iter().map(|f| &f.node).collect();
        let restored: Vec<&FuncDef> = reparsed.functions.iter().map(|f| &f.node).collect();
        prop_assert_eq!(restored, original);
    }

    #[test]
    fn printing_is_stable(program in arb_program()) {
        let once = pretty_print(&program);
        let reparsed = parse(&once).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(pretty_print(&reparsed), once);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn matrix_json_roundtrip(m in arb_matrix(4, 3)) {
        let decoded = Matrix::decode(m.encode().unwrap()).unwrap();
        prop_assert_eq!(decoded, m);
    }

    #[test]
    fn relation_json_roundtrip(body in arb_analyzable_body()) {
        let out = analyze_body(&body, 0, &AnalysisOptions::default()).unwrap();
        let json = serde_json::to_string(&out.relation).unwrap();
        let decoded: Relation = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(decoded.variables(), out.relation.variables());
        prop_assert_eq!(decoded.matrix(), out.relation.matrix());
        let choices_json = serde_json::to_string(&out.choices).unwrap();
        let choices: mwp::Choices = serde_json::from_str(&choices_json).unwrap();
        prop_assert_eq!(choices.vectors(), out.choices.vectors());
    }
}
