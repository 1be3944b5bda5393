#[cfg(test)]
mod parser_tests {
    use pretty_assertions::assert_eq;

    use treelox::ast::{Expr, Stmt};
    use treelox::ast_printer::AstPrinter;
    use treelox::parser::Parser;
    use treelox::scanner::Scanner;

    fn parser_for(source: &str) -> Parser {
        let mut scanner = Scanner::new(source);
        let tokens = scanner.scan_tokens();
        assert!(scanner.errors().is_empty(), "{:?}", scanner.errors());

        Parser::new(tokens)
    }

    fn print_expression(source: &str) -> String {
        let mut parser = parser_for(source);
        let expr = parser.parse_expression().expect("expression parses");

        AstPrinter::print(&expr)
    }

    fn print_program(source: &str) -> Vec<String> {
        let mut parser = parser_for(source);
        let statements: Vec<Stmt> = parser.parse();
        assert!(parser.errors().is_empty(), "{:?}", parser.errors());

        statements.iter().map(AstPrinter::print_stmt).collect()
    }

    fn on_large_stack<T, F>(work: F) -> T
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        std::thread::Builder::new()
            .stack_size(8 * 1024 * 1024)
            .spawn(work)
            .expect("spawn parser thread")
            .join()
            .expect("parser thread")
    }

    fn first_error(source: &str) -> String {
        let mut parser = parser_for(source);
        parser.parse();

        parser
            .errors()
            .first()
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    #[test]
    fn test_parser_01_precedence() {
        assert_eq!(print_expression("1 + 2 * 3"), "(+ 1.0 (* 2.0 3.0))");
        assert_eq!(print_expression("(1 + 2) * 3"), "(* (group (+ 1.0 2.0)) 3.0)");
        assert_eq!(print_expression("-123 * (45.67)"), "(* (- 123.0) (group 45.67))");
        assert_eq!(print_expression("!true == false"), "(== (! true) false)");
        assert_eq!(print_expression("1 < 2 == 3 >= 4"), "(== (< 1.0 2.0) (>= 3.0 4.0))");
    }

    #[test]
    fn test_parser_02_left_associativity() {
        assert_eq!(print_expression("1 - 2 - 3"), "(- (- 1.0 2.0) 3.0)");
        assert_eq!(print_expression("8 / 4 / 2"), "(/ (/ 8.0 4.0) 2.0)");
    }

    #[test]
    fn test_parser_03_logical_and_binds_tighter_than_or() {
        assert_eq!(print_expression("a or b and c"), "(or a (and b c))");
    }

    #[test]
    fn test_parser_04_assignment_is_right_associative() {
        assert_eq!(print_expression("a = b = 1"), "(= a (= b 1.0))");
        assert_eq!(print_expression("o.f.g = 2"), "(set g (. f o) 2.0)");
    }

    #[test]
    fn test_parser_05_calls_and_properties() {
        assert_eq!(print_expression("f(1)(2, 3)"), "(call (call f 1.0) 2.0 3.0)");
        assert_eq!(print_expression("a.b(c).d"), "(. d (call (. b a) c))");
        assert_eq!(print_expression("super.init"), "(super init)");
    }

    #[test]
    fn test_parser_06_declarations() {
        assert_eq!(
            print_program("var a = \"hi\"; var b; print a; fun f(x, y) { return x; }"),
            vec![
                "(var a = hi)",
                "(var b)",
                "(print a)",
                "(fun f(x y) (return x))",
            ]
        );
    }

    #[test]
    fn test_parser_07_class_declaration() {
        assert_eq!(
            print_program("class B < A { init(x) { this.x = x; } get() { return this.x; } }"),
            vec!["(class B < A (fun init(x) (; (set x this x))) (fun get() (return (. x this))))"]
        );
    }

    #[test]
    fn test_parser_08_for_desugars_to_while() {
        assert_eq!(
            print_program("for (var i = 0; i < 3; i = i + 1) print i;"),
            vec!["(block (var i = 0.0) (while (< i 3.0) (block (print i) (; (= i (+ i 1.0))))))"]
        );

        assert_eq!(
            print_program("for (;;) print 1;"),
            vec!["(while true (print 1.0))"]
        );
    }

    #[test]
    fn test_parser_09_if_else_binds_to_nearest_if() {
        assert_eq!(
            print_program("if (a) if (b) print 1; else print 2;"),
            vec!["(if a (if b (print 1.0) (print 2.0)))"]
        );
    }

    #[test]
    fn test_parser_10_missing_semicolon() {
        assert_eq!(first_error("print 1"), "[line 1] Error: Expect ';' after value.");
        assert_eq!(
            first_error("var x = 1\nprint x;"),
            "[line 2] Error: Expect ';' after variable declaration."
        );
    }

    #[test]
    fn test_parser_11_invalid_assignment_target() {
        assert_eq!(
            first_error("1 + 2 = 3;"),
            "[line 1] Error: Invalid assignment target."
        );
    }

    #[test]
    fn test_parser_12_expect_expression() {
        assert_eq!(first_error("print ;"), "[line 1] Error: Expect expression.");
        assert_eq!(first_error("(1 + 2;"), "[line 1] Error: Expect ')' after expression.");
    }

    #[test]
    fn test_parser_13_stops_at_first_error() {
        let mut parser = parser_for("print 1; print ; print 2; print ;");
        let statements = parser.parse();

        assert_eq!(statements.len(), 1);
        assert_eq!(parser.errors().len(), 1);
    }

    #[test]
    fn test_parser_14_too_many_arguments_is_not_fatal() {
        let arguments: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let source = format!("f({}); print 1;", arguments.join(", "));

        let mut parser = parser_for(&source);
        let statements = parser.parse();

        assert_eq!(statements.len(), 2);
        assert_eq!(
            parser.errors()[0].description(),
            "Can't have more than 255 arguments."
        );
    }

    #[test]
    fn test_parser_15_too_many_parameters_is_not_fatal() {
        let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
        let source = format!("fun f({}) {{}}", params.join(", "));

        let mut parser = parser_for(&source);
        let statements = parser.parse();

        assert_eq!(statements.len(), 1);
        assert_eq!(
            parser.errors()[0].description(),
            "Can't have more than 255 parameters."
        );
    }

    #[test]
    fn test_parser_16_parse_expression_rejects_trailing_tokens() {
        let mut parser = parser_for("1 + 2 3");
        let expr: Option<Expr> = parser.parse_expression();

        assert!(expr.is_none());
        assert_eq!(parser.errors().len(), 1);
    }

    #[test]
    fn test_parser_17_distinct_ids_for_identical_names() {
        let mut parser = parser_for("a; a;");
        let statements = parser.parse();

        let ids: Vec<_> = statements
            .iter()
            .map(|stmt| match stmt {
                Stmt::Expression(s) => match &s.expression {
                    Expr::Variable(v) => v.id,
                    other => panic!("unexpected expression {:?}", other),
                },
                other => panic!("unexpected statement {:?}", other),
            })
            .collect();

        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn test_parser_18_deep_grouping_is_rejected() {
        let source = format!("print {}1{};", "(".repeat(10_000), ")".repeat(10_000));

        assert_eq!(
            on_large_stack(move || first_error(&source)),
            "[line 1] Error: Too much nesting."
        );
    }

    #[test]
    fn test_parser_19_deep_unary_and_operator_chains_are_rejected() {
        let sources = vec![
            format!("print {}true;", "!".repeat(10_000)),
            format!("print 1{};", " + 1".repeat(10_000)),
            format!("print a{};", ".b".repeat(10_000)),
            format!("f{};", "()".repeat(10_000)),
            format!("{}1;", "a = ".repeat(10_000)),
            format!("{}{}", "{".repeat(10_000), "}".repeat(10_000)),
        ];

        for source in sources {
            let head: String = source.chars().take(12).collect();

            assert_eq!(
                on_large_stack(move || first_error(&source)),
                "[line 1] Error: Too much nesting.",
                "source starting {:?}",
                head
            );
        }
    }

    #[test]
    fn test_parser_20_moderate_nesting_still_parses() {
        let printed = on_large_stack(|| {
            let grouped = format!("{}1{}", "(".repeat(50), ")".repeat(50));
            let chained = format!("1{}", " + 1".repeat(100));
            let blocks = format!("{}print 1;{}", "{".repeat(40), "}".repeat(40));

            (
                print_expression(&grouped).starts_with("(group (group"),
                print_expression(&chained).starts_with("(+ (+"),
                print_program(&blocks).len(),
            )
        });

        assert_eq!(printed, (true, true, 1));
    }
}
