use nfl_edge::odds::{MarketKind, Side};
use nfl_edge::odds_fetch;
use nfl_edge::schedule_fetch;

const SCOREBOARD_JSON: &str = r#"{
  "events": [
    {
      "id": "401671789",
      "date": "2024-09-06T00:20Z",
      "season": {"year": 2024, "type": 2},
      "week": {"number": 1},
      "competitions": [
        {
          "competitors": [
            {"homeAway": "home", "team": {"abbreviation": "KC"}, "score": "27"},
            {"homeAway": "away", "team": {"abbreviation": "BAL"}, "score": "20"}
          ],
          "status": {"type": {"completed": true}}
        }
      ]
    },
    {
      "id": "401671822",
      "date": "2024-09-08T17:00Z",
      "season": {"year": 2024, "type": 2},
      "week": {"number": 1},
      "competitions": [
        {
          "competitors": [
            {"homeAway": "home", "team": {"abbreviation": "WSH"}, "score": "0"},
            {"homeAway": "away", "team": {"abbreviation": "TB"}, "score": "0"}
          ],
          "status": {"type": {"completed": false}}
        }
      ]
    },
    {
      "id": "999",
      "date": "2024-09-08T17:00Z",
      "competitions": [
        {
          "competitors": [
            {"homeAway": "home", "team": {"abbreviation": "XX"}, "score": "10"},
            {"homeAway": "away", "team": {"abbreviation": "KC"}, "score": "3"}
          ],
          "status": {"type": {"completed": true}}
        }
      ]
    }
  ]
}"#;

#[test]
fn scoreboard_parses_completed_and_future_games() {
    let page = schedule_fetch::parse_scoreboard_json(SCOREBOARD_JSON, 2024, 1).unwrap();
    assert_eq!(page.games.len(), 2);
    assert_eq!(page.skipped_teams, 1);

    let done = &page.games[0];
    assert_eq!(done.game_id, "401671789");
    assert_eq!(done.home_team, "KC");
    assert_eq!(done.away_team, "BAL");
    assert_eq!(done.home_score, Some(27));
    assert!(done.completed());
    assert_eq!(done.home_won(), Some(true));

    // ESPN sends placeholder zero scores before kickoff; they must not be
    // read as a real 0-0 result.
    let future = &page.games[1];
    assert_eq!(future.home_team, "WAS");
    assert_eq!(future.home_score, None);
    assert!(!future.completed());
}

#[test]
fn scoreboard_rejects_payloads_without_events() {
    assert!(schedule_fetch::parse_scoreboard_json("{}", 2024, 1).is_err());
    assert!(schedule_fetch::parse_scoreboard_json("not json", 2024, 1).is_err());
}

const ODDS_JSON: &str = r#"[
  {
    "commence_time": "2024-09-06T00:20:00Z",
    "home_team": "Kansas City Chiefs",
    "away_team": "Baltimore Ravens",
    "bookmakers": [
      {
        "key": "draftkings",
        "markets": [
          {
            "key": "h2h",
            "outcomes": [
              {"name": "Kansas City Chiefs", "price": -150},
              {"name": "Baltimore Ravens", "price": 130}
            ]
          },
          {
            "key": "spreads",
            "outcomes": [
              {"name": "Kansas City Chiefs", "price": -110, "point": -2.5},
              {"name": "Baltimore Ravens", "price": -110, "point": 2.5}
            ]
          }
        ]
      }
    ]
  },
  {
    "commence_time": "2024-09-06T00:20:00Z",
    "home_team": "Mars Rovers",
    "away_team": "Baltimore Ravens",
    "bookmakers": []
  }
]"#;

#[test]
fn odds_payload_resolves_names_and_extracts_both_markets() {
    let parsed = odds_fetch::parse_odds_events(ODDS_JSON).unwrap();
    assert_eq!(parsed.events.len(), 1);
    assert_eq!(parsed.skipped_teams, 1);

    let event = &parsed.events[0];
    assert_eq!(event.home, "KC");
    assert_eq!(event.away, "BAL");
    assert_eq!(event.quotes.len(), 4);

    let home_ml = event
        .quotes
        .iter()
        .find(|q| q.market == MarketKind::Moneyline && q.side == Side::Home)
        .unwrap();
    assert_eq!(home_ml.price, -150);
    assert_eq!(home_ml.book, "draftkings");

    let home_spread = event
        .quotes
        .iter()
        .find(|q| q.market == MarketKind::Spread && q.side == Side::Home)
        .unwrap();
    assert_eq!(home_spread.point, Some(-2.5));
}
