// Renaming a variable rewrites the expressions that refer to it.
// Run with: cargo test -p forecast-engine --test rename

use forecast_config::Settings;
use forecast_core::{Month, MonthRange, TimeSegment, Variable, VariableId, VariableType};
use forecast_engine::expr::parse_expression;
use forecast_engine::*;

fn m(s: &str) -> Month {
    s.parse().unwrap()
}

/// Revenue, Cost = Revenue * 0.4, Margin = Revenue - Cost, Units (no refs).
fn variables() -> Vec<Variable> {
    let mut revenue = Variable::new("rev", "Revenue", VariableType::Real);
    revenue.upsert_time_segment(TimeSegment::basic(m("2024-01"), 100.0));
    let mut cost = Variable::new("cost", "Cost", VariableType::Real);
    let mut margin = Variable::new("margin", "Margin", VariableType::Real);
    let mut units = Variable::new("units", "Units", VariableType::Integer);
    units.upsert_time_segment(TimeSegment::basic(m("2024-01"), 7.0));

    let all = vec![revenue.clone(), cost.clone(), margin.clone(), units.clone()];
    cost.upsert_time_segment(TimeSegment::expression(
        m("2024-01"),
        parse_expression("Revenue * 0.4", &all).unwrap(),
    ));
    margin.upsert_time_segment(TimeSegment::expression(
        m("2024-02"),
        parse_expression("(Revenue-Cost) / Revenue", &all).unwrap(),
    ));
    vec![revenue, cost, margin, units]
}

fn sheet() -> ForecastSheet<MemoryStore> {
    let vars = variables();
    let context = SheetContext::new(m("2024-01"), MonthRange::new(m("2024-01"), m("2024-03")));
    ForecastSheet::new(MemoryStore::new(vars.clone()), vars, context, Settings::default())
}

fn expression_text(sheet: &ForecastSheet<MemoryStore>, id: &str, date: &str) -> String {
    sheet
        .store()
        .variable(&VariableId::new(id))
        .and_then(|v| v.time_segment_at(m(date)))
        .and_then(|s| s.as_expression())
        .map(|e| e.text.clone())
        .unwrap_or_default()
}

#[test]
fn test_rename_rewrites_referencing_expressions() {
    let mut sheet = sheet();
    let repaired = sheet.update_variable_title(&VariableId::new("rev"), "Sales").unwrap();

    assert_eq!(repaired, 2);
    assert_eq!(expression_text(&sheet, "cost", "2024-01"), "Sales * 0.4");
    assert_eq!(expression_text(&sheet, "margin", "2024-02"), "(Sales-Cost) / Sales");

    let cost = sheet.store().variable(&VariableId::new("cost")).unwrap();
    let expr = cost.time_segments[0].as_expression().unwrap();
    assert_eq!(expr.reference_for("Sales"), Some(&VariableId::new("rev")));
    assert_eq!(expr.reference_for("Revenue"), None);

    let origins: Vec<MutationOrigin> = sheet.store().updates().iter().map(|u| u.origin).collect();
    assert_eq!(
        origins,
        vec![MutationOrigin::User, MutationOrigin::ExpressionRepair, MutationOrigin::ExpressionRepair]
    );
    assert!(sheet.store().updates().iter().all(|u| u.id.as_str() != "units"));

    assert!(sheet.events().iter().any(|e| matches!(
        e,
        SheetEvent::UpdateVariableTitle { old, new, .. } if old == "Revenue" && new == "Sales"
    )));
}

#[test]
fn test_projection_survives_rename() {
    let mut sheet = sheet();
    assert_eq!(sheet.projections()[1].frames[0].projected_value, Some(40.0));
    sheet.update_variable_title(&VariableId::new("rev"), "Sales").unwrap();
    assert_eq!(sheet.projections()[1].frames[0].projected_value, Some(40.0));
    assert_eq!(sheet.projections()[2].frames[1].projected_value, Some(0.6));
}

#[test]
fn test_rename_without_references_repairs_nothing() {
    let mut sheet = sheet();
    assert_eq!(sheet.update_variable_title(&VariableId::new("units"), "Seats").unwrap(), 0);
    assert_eq!(sheet.store().update_count(), 1);
    assert_eq!(sheet.variable(&VariableId::new("units")).unwrap().title, "Seats");
}

#[test]
fn test_rename_rejects_bad_names() {
    let mut sheet = sheet();
    let id = VariableId::new("rev");
    for bad in ["", "Net Sales", "Cost", "123", "__", "Sales!"] {
        let err = sheet.update_variable_title(&id, bad).unwrap_err();
        assert!(matches!(err, SheetError::Validation(ValidationError::InvalidName(_))), "{:?}", bad);
    }
    assert_eq!(sheet.store().update_count(), 0);
    assert_eq!(expression_text(&sheet, "cost", "2024-01"), "Revenue * 0.4");
}

#[test]
fn test_history_capacity_from_settings() {
    let vars = variables();
    let settings = Settings::from_json_str(r#"{ "history.maxEntries": 2 }"#).unwrap();
    let context = SheetContext::new(m("2024-01"), MonthRange::new(m("2024-01"), m("2024-03")));
    let mut sheet = ForecastSheet::new(MemoryStore::new(vars.clone()), vars, context, settings);
    let id = VariableId::new("units");

    for v in 1..=4 {
        sheet
            .upsert_timesegment(&id, m("2024-02"), Some(TimeSegment::basic(m("2024-02"), v as f64)))
            .unwrap();
    }
    assert_eq!(sheet.history().undo_len(), 2);

    sheet.undo().unwrap();
    sheet.undo().unwrap();
    assert_eq!(sheet.undo().unwrap(), None);
    let units = sheet.variable(&id).unwrap();
    assert_eq!(units.time_segment_at(m("2024-02")).and_then(|s| s.basic_value()), Some(2.0));
}

#[test]
fn test_new_edit_clears_redo() {
    let mut sheet = sheet();
    let id = VariableId::new("units");
    sheet.upsert_actual_value(&id, m("2024-01"), Some(3.0)).unwrap();
    sheet.undo().unwrap();
    assert!(sheet.history().can_redo());

    sheet.upsert_actual_value(&id, m("2024-01"), Some(4.4)).unwrap();
    assert!(!sheet.history().can_redo());
    assert_eq!(sheet.redo().unwrap(), None);
    assert_eq!(sheet.variable(&id).unwrap().actual_at(m("2024-01")), Some(4.0));
}
