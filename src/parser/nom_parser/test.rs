use super::*;

fn param<'src>(name: &'src str, value: &str) -> ParamDef<'src> {
    ParamDef {
        name,
        value: value.to_owned(),
    }
}

#[test]
fn test_trees() {
    assert_eq!(
        parse_tree(
            "tree main = Sequence {
        }"
        ),
        Ok((
            "",
            TreeRootDef {
                name: "main",
                root: TreeDef::new("Sequence"),
            }
        ))
    );

    assert_eq!(
        parse_tree(
            "tree main = Sequence {
            Wait
            Log
        }"
        ),
        Ok((
            "",
            TreeRootDef {
                name: "main",
                root: TreeDef::new_with_children(
                    "Sequence",
                    vec![TreeDef::new("Wait"), TreeDef::new("Log")]
                ),
            }
        ))
    );
}

#[test]
fn test_params() {
    assert_eq!(
        parse_tree(r#"tree main = Wait (ticks = "3")"#),
        Ok((
            "",
            TreeRootDef {
                name: "main",
                root: TreeDef::new_with_params("Wait", vec![param("ticks", "3")]),
            }
        ))
    );

    assert_eq!(
        parse_tree_node("Guard (key = alarm, expect = false)"),
        Ok((
            "",
            TreeDef::new_with_params(
                "Guard",
                vec![param("key", "alarm"), param("expect", "false")]
            )
        ))
    );

    assert_eq!(
        parse_tree_node(
            r#"Log (
                message = "two\nlines"
            )"#
        ),
        Ok((
            "",
            TreeDef::new_with_params("Log", vec![param("message", "two\nlines")])
        ))
    );
    assert_eq!(
        parse_tree_node(r#"Log (message = "a\\n b\\\\ c\t")"#),
        Ok((
            "",
            TreeDef::new_with_params("Log", vec![param("message", "a\\n b\\\\ c\\t")])
        ))
    );
}

#[test]
fn test_nested_with_comments() {
    let src = r#"tree main = Sequence {
    # wait first
    Wait (ticks = 1)
    Selector {
        IsTrue (key = "a") # check
        Log
    }
}"#;

    let expected = TreeDef::new_with_children(
        "Sequence",
        vec![
            TreeDef::new_with_params("Wait", vec![param("ticks", "1")]),
            TreeDef::new_with_children(
                "Selector",
                vec![
                    TreeDef::new_with_params("IsTrue", vec![param("key", "a")]),
                    TreeDef::new("Log"),
                ],
            ),
        ],
    );

    assert_eq!(
        parse_tree(src),
        Ok((
            "",
            TreeRootDef {
                name: "main",
                root: expected,
            }
        ))
    );
}

#[test]
fn test_not() {
    assert_eq!(
        parse_conditional_expr("!IsTrue (key = a)"),
        Ok((
            "",
            TreeDef::new_with_child(
                "Inverter",
                TreeDef::new_with_params("IsTrue", vec![param("key", "a")])
            )
        ))
    );

    assert_eq!(
        parse_tree("tree main = Sequence { !!Log }"),
        Ok((
            "",
            TreeRootDef {
                name: "main",
                root: TreeDef::new_with_child(
                    "Sequence",
                    TreeDef::new_with_child(
                        "Inverter",
                        TreeDef::new_with_child("Inverter", TreeDef::new("Log"))
                    )
                ),
            }
        ))
    );
}

#[test]
fn test_file() {
    let src = r#"
# header comment
tree main = Sequence {
    sub
}

tree sub = Log (message = "hi")
"#;

    let (rest, source) = parse_file(src).unwrap();
    assert_eq!(rest, "");
    assert_eq!(source.tree_defs.len(), 2);
    assert_eq!(
        source.find("main").map(|tree| tree.root()),
        Some(&TreeDef::new_with_child("Sequence", TreeDef::new("sub")))
    );
    assert_eq!(
        source.find("sub").map(|tree| tree.root()),
        Some(&TreeDef::new_with_params("Log", vec![param("message", "hi")]))
    );
    assert!(source.find("other").is_none());
}

#[test]
fn test_unconsumed_input() {
    let (rest, source) = parse_file("tree main = Sequence { Log }\n}").unwrap();
    assert_eq!(rest, "}");
    assert_eq!(source.tree_defs.len(), 1);
}
