// src/evaluator/rating.rs — Letter grades from consensus scores

/// Map an average score (0–10) to a letter. Boundaries are inclusive.
pub fn letter_rating(average: f64) -> &'static str {
    match average {
        a if a >= 9.0 => "S",
        a if a >= 8.0 => "A",
        a if a >= 7.0 => "B",
        a if a >= 6.0 => "C",
        a if a >= 5.0 => "D",
        _ => "F",
    }
}

/// Arithmetic mean, `None` for an empty input.
pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries() {
        assert_eq!(letter_rating(9.0), "S");
        assert_eq!(letter_rating(8.999), "A");
        assert_eq!(letter_rating(8.0), "A");
        assert_eq!(letter_rating(7.0), "B");
        assert_eq!(letter_rating(6.5), "C");
        assert_eq!(letter_rating(5.0), "D");
        assert_eq!(letter_rating(4.99), "F");
        assert_eq!(letter_rating(10.0), "S");
        assert_eq!(letter_rating(0.0), "F");
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean([8.0, 6.0]), Some(7.0));
        assert_eq!(mean(Vec::<f64>::new()), None);
    }
}
