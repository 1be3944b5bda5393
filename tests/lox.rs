mod common;

#[cfg(test)]
mod lox_tests {
    use std::fs;
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use crate::common::run_ok;

    fn fixture(name: &str) -> String {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(name);

        fs::read_to_string(&path).expect("fixture is readable")
    }

    #[test]
    fn test_lox_file() {
        assert_eq!(
            run_ok(&fixture("bank.lox")),
            vec!["true", "false", "6", "ann: plain", "sam: savings", "3"]
        );
    }
}
