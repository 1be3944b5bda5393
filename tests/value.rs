#[cfg(test)]
mod value_tests {
    use pretty_assertions::assert_eq;

    use treelox::value::Value;

    fn render(n: f64) -> String {
        Value::Number(n).to_string()
    }

    #[test]
    fn test_integral_numbers_drop_the_fraction() {
        assert_eq!(render(3.0), "3");
        assert_eq!(render(-42.0), "-42");
        assert_eq!(render(0.0), "0");
        assert_eq!(render(1e20), "100000000000000000000");
    }

    #[test]
    fn test_fractional_numbers_use_shortest_form() {
        assert_eq!(render(2.5), "2.5");
        assert_eq!(render(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(render(0.000001), "0.000001");
    }

    #[test]
    fn test_large_and_tiny_magnitudes_use_exponent_form() {
        assert_eq!(render(1e21), "1e21");
        assert_eq!(render(1e300), "1e300");
        assert_eq!(render(-2.5e40), "-2.5e40");
        assert_eq!(render(1e-7), "1e-7");
        assert_eq!(render(f64::MAX), "1.7976931348623157e308");
    }

    #[test]
    fn test_non_finite_numbers() {
        assert_eq!(render(f64::INFINITY), "inf");
        assert_eq!(render(f64::NEG_INFINITY), "-inf");
        assert_eq!(render(f64::NAN), "NaN");
    }
}
