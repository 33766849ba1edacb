use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketKind {
    Moneyline,
    Spread,
}

/// One book's price for one side of one market. Spread quotes carry the
/// point (home-relative line on the home side).
#[derive(Debug, Clone)]
pub struct MarketQuote {
    pub book: String,
    pub market: MarketKind,
    pub side: Side,
    pub price: i32,
    pub point: Option<f64>,
}

/// One reduced price pair per game. Prices are `None` when no book quoted
/// that side; a missing price is never treated as zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsensusQuote {
    pub home_price: Option<f64>,
    pub away_price: Option<f64>,
    pub home_line: Option<f64>,
    pub home_spread_price: Option<f64>,
    pub away_spread_price: Option<f64>,
    pub books_used: u8,
}

/// Reduce many book quotes to one consensus. The first preferred book that
/// quotes both moneyline sides is used outright; otherwise each side takes
/// the median across books (robust to one stray line). Spread consensus only
/// considers books quoting a complete (line, home price, away price) triple,
/// restricted to the line cluster closest to pick'em so medians compare like
/// with like.
pub fn consensus(quotes: &[MarketQuote], preferred_books: &[String]) -> ConsensusQuote {
    let mut out = ConsensusQuote::default();

    // Moneyline: per-book price pairs keyed by book.
    let mut ml_by_book: BTreeMap<&str, (Option<f64>, Option<f64>)> = BTreeMap::new();
    for q in quotes.iter().filter(|q| q.market == MarketKind::Moneyline) {
        let entry = ml_by_book.entry(q.book.as_str()).or_default();
        match q.side {
            Side::Home => entry.0 = Some(f64::from(q.price)),
            Side::Away => entry.1 = Some(f64::from(q.price)),
        }
    }

    let preferred_ml = preferred_books.iter().find_map(|book| {
        ml_by_book.get(book.as_str()).and_then(|(h, a)| match (h, a) {
            (Some(h), Some(a)) => Some((*h, *a)),
            _ => None,
        })
    });
    if let Some((h, a)) = preferred_ml {
        out.home_price = Some(h);
        out.away_price = Some(a);
    } else {
        let home: Vec<f64> = ml_by_book.values().filter_map(|(h, _)| *h).collect();
        let away: Vec<f64> = ml_by_book.values().filter_map(|(_, a)| *a).collect();
        out.home_price = median_f64(&home);
        out.away_price = median_f64(&away);
    }
    out.books_used = ml_by_book.len().min(u8::MAX as usize) as u8;

    // Spreads: assemble complete per-book triples.
    let mut sp_by_book: BTreeMap<&str, (Option<f64>, Option<f64>, Option<f64>)> = BTreeMap::new();
    for q in quotes.iter().filter(|q| q.market == MarketKind::Spread) {
        let entry = sp_by_book.entry(q.book.as_str()).or_default();
        match q.side {
            Side::Home => {
                entry.0 = q.point;
                entry.1 = Some(f64::from(q.price));
            }
            Side::Away => entry.2 = Some(f64::from(q.price)),
        }
    }
    let complete: Vec<(&str, f64, f64, f64)> = sp_by_book
        .iter()
        .filter_map(|(book, (line, hp, ap))| match (line, hp, ap) {
            (Some(line), Some(hp), Some(ap)) => Some((*book, *line, *hp, *ap)),
            _ => None,
        })
        .collect();

    let preferred_sp = preferred_books.iter().find_map(|p| {
        complete
            .iter()
            .find(|(book, ..)| book == p)
            .map(|&(_, line, hp, ap)| (line, hp, ap))
    });
    if let Some((line, hp, ap)) = preferred_sp {
        out.home_line = Some(line);
        out.home_spread_price = Some(hp);
        out.away_spread_price = Some(ap);
    } else if !complete.is_empty() {
        let min_abs = complete
            .iter()
            .map(|(_, line, ..)| line.abs())
            .fold(f64::INFINITY, f64::min);
        let cluster: Vec<&(&str, f64, f64, f64)> = complete
            .iter()
            .filter(|(_, line, ..)| line.abs() == min_abs)
            .collect();
        out.home_line = median_f64(&cluster.iter().map(|t| t.1).collect::<Vec<_>>());
        out.home_spread_price = median_f64(&cluster.iter().map(|t| t.2).collect::<Vec<_>>());
        out.away_spread_price = median_f64(&cluster.iter().map(|t| t.3).collect::<Vec<_>>());
    }

    out
}

/// American price to raw implied probability. Null in, null out.
pub fn price_to_prob(price: Option<f64>) -> Option<f64> {
    let p = price?;
    if !p.is_finite() {
        return None;
    }
    if p >= 0.0 {
        Some(100.0 / (p + 100.0))
    } else {
        Some(-p / (-p + 100.0))
    }
}

/// Rescale two complementary implied probabilities so they sum to one.
/// Undefined (both `None`) when either input is missing or the sum is
/// non-positive.
pub fn remove_vig(p_a: Option<f64>, p_b: Option<f64>) -> (Option<f64>, Option<f64>) {
    let (Some(a), Some(b)) = (p_a, p_b) else {
        return (None, None);
    };
    let sum = a + b;
    if !sum.is_finite() || sum <= 0.0 {
        return (None, None);
    }
    (Some(a / sum), Some(b / sum))
}

fn median_f64(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ml(book: &str, side: Side, price: i32) -> MarketQuote {
        MarketQuote {
            book: book.to_string(),
            market: MarketKind::Moneyline,
            side,
            price,
            point: None,
        }
    }

    fn spread(book: &str, side: Side, price: i32, point: Option<f64>) -> MarketQuote {
        MarketQuote {
            book: book.to_string(),
            market: MarketKind::Spread,
            side,
            price,
            point,
        }
    }

    #[test]
    fn implied_probability_matches_american_convention() {
        assert!((price_to_prob(Some(-150.0)).unwrap() - 0.6).abs() < 1e-9);
        assert!((price_to_prob(Some(130.0)).unwrap() - 100.0 / 230.0).abs() < 1e-9);
        assert!((price_to_prob(Some(100.0)).unwrap() - 0.5).abs() < 1e-9);
        assert_eq!(price_to_prob(None), None);
    }

    #[test]
    fn implied_probability_is_monotone_in_price() {
        // Longer underdog odds mean less likely; deeper favorites more.
        assert!(price_to_prob(Some(150.0)) < price_to_prob(Some(120.0)));
        assert!(price_to_prob(Some(-200.0)) > price_to_prob(Some(-120.0)));
        assert!(price_to_prob(Some(-110.0)) > price_to_prob(Some(110.0)));
    }

    #[test]
    fn fair_probs_for_minus150_plus130() {
        let raw_home = price_to_prob(Some(-150.0));
        let raw_away = price_to_prob(Some(130.0));
        let (fair_home, fair_away) = remove_vig(raw_home, raw_away);
        assert!((fair_home.unwrap() - 0.580).abs() < 0.001);
        assert!((fair_away.unwrap() - 0.420).abs() < 0.001);
        assert!((fair_home.unwrap() + fair_away.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn vig_removal_is_idempotent_on_fair_pairs() {
        let (a, b) = remove_vig(Some(0.58), Some(0.42));
        assert!((a.unwrap() - 0.58).abs() < 1e-12);
        assert!((b.unwrap() - 0.42).abs() < 1e-12);
    }

    #[test]
    fn vig_removal_is_undefined_on_missing_or_degenerate_input() {
        assert_eq!(remove_vig(None, Some(0.5)), (None, None));
        assert_eq!(remove_vig(Some(0.0), Some(0.0)), (None, None));
    }

    #[test]
    fn preferred_book_wins_when_it_quotes_both_sides() {
        let quotes = vec![
            ml("fanduel", Side::Home, -160),
            ml("fanduel", Side::Away, 140),
            ml("draftkings", Side::Home, -150),
            ml("draftkings", Side::Away, 130),
        ];
        let c = consensus(&quotes, &["draftkings".to_string()]);
        assert_eq!(c.home_price, Some(-150.0));
        assert_eq!(c.away_price, Some(130.0));
        assert_eq!(c.books_used, 2);
    }

    #[test]
    fn median_across_books_when_no_preferred_quote() {
        let quotes = vec![
            ml("a", Side::Home, -140),
            ml("b", Side::Home, -150),
            ml("c", Side::Home, -170),
            ml("a", Side::Away, 120),
            ml("b", Side::Away, 130),
        ];
        let c = consensus(&quotes, &[]);
        assert_eq!(c.home_price, Some(-150.0));
        assert_eq!(c.away_price, Some(125.0));
    }

    #[test]
    fn missing_side_stays_null() {
        let quotes = vec![ml("a", Side::Home, -120)];
        let c = consensus(&quotes, &[]);
        assert_eq!(c.home_price, Some(-120.0));
        assert_eq!(c.away_price, None);
        assert_eq!(price_to_prob(c.away_price), None);
    }

    #[test]
    fn preferred_book_order_decides_the_spread_too() {
        let quotes = vec![
            spread("fanduel", Side::Home, -112, Some(-3.0)),
            spread("fanduel", Side::Away, -108, None),
            spread("draftkings", Side::Home, -110, Some(-2.5)),
            spread("draftkings", Side::Away, -110, None),
        ];
        let preferred = vec!["draftkings".to_string(), "fanduel".to_string()];
        let c = consensus(&quotes, &preferred);
        assert_eq!(c.home_line, Some(-2.5));
        assert_eq!(c.home_spread_price, Some(-110.0));
    }

    #[test]
    fn spread_consensus_uses_closest_to_zero_cluster() {
        let quotes = vec![
            spread("a", Side::Home, -110, Some(-2.5)),
            spread("a", Side::Away, -110, None),
            spread("b", Side::Home, -108, Some(-2.5)),
            spread("b", Side::Away, -112, None),
            // An outlier book hanging a stale line.
            spread("c", Side::Home, -105, Some(-6.5)),
            spread("c", Side::Away, -115, None),
        ];
        let c = consensus(&quotes, &[]);
        assert_eq!(c.home_line, Some(-2.5));
        assert_eq!(c.home_spread_price, Some(-109.0));
        assert_eq!(c.away_spread_price, Some(-111.0));
    }
}
