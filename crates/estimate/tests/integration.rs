use std::path::PathBuf;

use inciscope_estimate::model::{EstimateNote, EstimateRequest, PercentSource};
use inciscope_estimate::normalize::split_declaration;
use inciscope_estimate::resolver::MatchMethod;
use inciscope_estimate::{
    reconstruct, run, EstimateError, FormulaContext, IdentityResolver, Reconstruction, Resolution,
};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn context() -> FormulaContext {
    let path = fixtures_dir().join("skincare.toml");
    let toml = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    FormulaContext::from_toml(&toml).unwrap()
}

fn total(r: &Reconstruction) -> f64 {
    r.slots.iter().map(|s| s.percentage).sum()
}

fn assert_valid(r: &Reconstruction) {
    assert!((total(r) - 100.0).abs() < 1e-6, "total {}", total(r));
    for s in &r.slots {
        assert!(s.percentage >= 0.0, "negative at {}: {}", s.position, s.percentage);
    }
    if let Some(line) = r.meta.line_position {
        for s in &r.slots[line..] {
            assert!(s.percentage <= 1.0, "position {} above cap: {}", s.position, s.percentage);
        }
    }
}

// -------------------------------------------------------------------------
// Worked example
// -------------------------------------------------------------------------

#[test]
fn water_glycerin_niacinamide_phenoxyethanol() {
    let request = EstimateRequest::new("serum", ["Water", "Glycerin", "Niacinamide", "Phenoxyethanol"])
        .with_known("Niacinamide", 5.0);
    let r = run(&context(), &request).unwrap();

    assert_valid(&r);
    assert_eq!(r.meta.line_position, Some(3));
    assert_eq!(r.slots[2].percentage, 5.0);
    assert_eq!(r.slots[2].source, PercentSource::Anchor);
    assert!(r.slots[3].percentage <= 1.0);
    assert_eq!(r.slots[3].source, PercentSource::SubLine);

    assert_eq!(r.slots[0].source, PercentSource::Base);
    assert_eq!(r.slots[1].source, PercentSource::Interpolated);
    let (water, glycerin) = (r.slots[0].percentage, r.slots[1].percentage);
    assert!(water > glycerin && glycerin > 5.0, "water {water}, glycerin {glycerin}");

    // base + (base + 5) / 2 + 5 + 0.75 = 100
    let base = r.meta.base_value.unwrap();
    assert!((base - 61.1667).abs() < 0.01, "base {base}");
    assert!(r.summary.residual.abs() < 0.01);
}

#[test]
fn percentages_are_position_pairs() {
    let request = EstimateRequest::new("serum", ["Water", "Glycerin", "Phenoxyethanol"]);
    let r = run(&context(), &request).unwrap();
    let pairs = r.percentages();
    assert_eq!(pairs.iter().map(|(p, _)| *p).collect::<Vec<_>>(), vec![0, 1, 2]);
    assert_eq!(pairs.len(), r.slots.len());
    assert_eq!(pairs[2].1, r.slots[2].percentage);
}

// -------------------------------------------------------------------------
// Rejections
// -------------------------------------------------------------------------

#[test]
fn increasing_known_values_rejected() {
    let request = EstimateRequest::new(
        "serum",
        ["Water", "Niacinamide", "Glycerin", "Retinol", "Phenoxyethanol"],
    )
    .with_known("Niacinamide", 2.0)
    .with_known("Retinol", 5.0);
    let err = run(&context(), &request).unwrap_err();
    assert_eq!(
        err,
        EstimateError::OrderViolation {
            earlier: "Niacinamide".into(),
            earlier_value: 2.0,
            later: "Retinol".into(),
            later_value: 5.0,
        }
    );
}

#[test]
fn known_values_in_any_input_order_are_sorted_by_position() {
    let request = EstimateRequest::new(
        "serum",
        ["Water", "Niacinamide", "Glycerin", "Retinol", "Phenoxyethanol"],
    )
    .with_known("Retinol", 0.5)
    .with_known("Niacinamide", 5.0);
    let r = run(&context(), &request).unwrap();
    assert_valid(&r);
    assert_eq!(r.slots[1].percentage, 5.0);
    assert_eq!(r.slots[3].percentage, 0.5);
}

#[test]
fn overflow_rejected_on_any_list() {
    for list in [vec![], vec!["Water"], vec!["Water", "Glycerin", "Phenoxyethanol"]] {
        let request = EstimateRequest::new("serum", list)
            .with_known("Water", 70.0)
            .with_known("Glycerin", 35.0);
        let err = run(&context(), &request).unwrap_err();
        assert_eq!(err, EstimateError::AnchorOverflow { total: 105.0 });
    }
}

#[test]
fn single_known_value_over_100_is_overflow() {
    let request = EstimateRequest::new("serum", ["Water", "Glycerin"]).with_known("Water", 105.0);
    let err = run(&context(), &request).unwrap_err();
    assert_eq!(err, EstimateError::AnchorOverflow { total: 105.0 });
}

#[test]
fn unmatched_known_name_rejected() {
    let request = EstimateRequest::new("serum", ["Water", "Glycerin", "Phenoxyethanol"])
        .with_known("Bakuchiol", 1.0);
    let err = run(&context(), &request).unwrap_err();
    assert_eq!(err, EstimateError::UnresolvedAnchor { name: "Bakuchiol".into() });
    assert!(err.is_anchor_error());
}

#[test]
fn high_known_value_after_marker_rejected() {
    let request = EstimateRequest::new("serum", ["Water", "Phenoxyethanol", "Niacinamide"])
        .with_known("Niacinamide", 4.0);
    let err = run(&context(), &request).unwrap_err();
    assert!(matches!(err, EstimateError::OrderViolation { later_value, .. } if later_value == 4.0));
}

#[test]
fn fully_known_list_must_balance() {
    let request = EstimateRequest::new("serum", ["Water", "Glycerin"])
        .with_known("Water", 80.0)
        .with_known("Glycerin", 10.0);
    let err = run(&context(), &request).unwrap_err();
    assert_eq!(err, EstimateError::FullyAnchored { total: 90.0 });

    let request = EstimateRequest::new("serum", ["Water", "Glycerin"])
        .with_known("Water", 90.0)
        .with_known("Glycerin", 10.0);
    let r = run(&context(), &request).unwrap();
    assert_eq!(r.percentages(), vec![(0, 90.0), (1, 10.0)]);
}

// -------------------------------------------------------------------------
// Edge cases
// -------------------------------------------------------------------------

#[test]
fn empty_declaration() {
    let r = run(&context(), &EstimateRequest::new("serum", Vec::<String>::new())).unwrap();
    assert!(r.slots.is_empty());
    assert_eq!(r.summary.total_slots, 0);
    assert_eq!(total(&r), 0.0);
}

#[test]
fn duplicate_names_are_independent_slots() {
    let list = [
        "Water",
        "Glycerin",
        "Butylene Glycol",
        "Niacinamide",
        "Panthenol",
        "Sodium Hyaluronate",
        "Aloe Barbadensis Leaf Juice",
        "Water",
        "Phenoxyethanol",
    ];
    let r = run(&context(), &EstimateRequest::new("serum", list)).unwrap();
    assert_valid(&r);
    assert_eq!(r.slots[0].identity.as_deref(), Some("water"));
    assert_eq!(r.slots[7].identity.as_deref(), Some("water"));
    assert!(r.slots[0].percentage > r.slots[7].percentage);
    assert!(r.slots[7].percentage > 1.0);
}

#[test]
fn duplicate_known_names_attach_in_order() {
    let list = ["Water", "Glycerin", "Water", "Phenoxyethanol"];
    let request = EstimateRequest::new("serum", list)
        .with_known("Water", 70.0)
        .with_known("Water", 3.0);
    let r = run(&context(), &request).unwrap();
    assert_valid(&r);
    assert_eq!(r.slots[0].percentage, 70.0);
    assert_eq!(r.slots[2].percentage, 3.0);
    assert_eq!(r.slots[0].source, PercentSource::Anchor);
    // Free prefix is empty, the first free slot takes the residual.
    assert!(r
        .notes
        .iter()
        .any(|n| matches!(n, EstimateNote::ResidualToFirstFree { position: 1, .. })));
}

#[test]
fn aliases_qualifiers_and_typos_resolve() {
    let list = ["Aqua/Water/Eau", "Glycerine", "Tocopherol (Vitamin E)", "Parfum", "Phenoxyethanol."];
    let request = EstimateRequest::new("serum", list).with_known("Glycerin", 4.0);
    let r = run(&context(), &request).unwrap();
    assert_valid(&r);

    let ids: Vec<_> = r.slots.iter().map(|s| s.identity.as_deref()).collect();
    assert_eq!(
        ids,
        vec![
            Some("water"),
            Some("glycerin"),
            Some("tocopherol"),
            Some("fragrance"),
            Some("phenoxyethanol")
        ]
    );
    // Parfum resolves to a marker, so the line sits at position 3.
    assert_eq!(r.meta.line_position, Some(3));
    assert_eq!(r.slots[1].percentage, 4.0);
}

#[test]
fn missing_usage_data_degrades_without_failing() {
    let list = ["Water", "Glycerin", "Phenoxyethanol", "Snail Secretion Filtrate", "Madecassoside"];
    let r = run(&context(), &EstimateRequest::new("serum", list)).unwrap();
    assert_valid(&r);
    assert_eq!(r.summary.degraded, 2);
    assert_eq!(r.summary.unresolved, 2);
    assert_eq!(r.slots[3].percentage, 0.55);
}

#[test]
fn no_marker_puts_line_at_end() {
    let r = run(&context(), &EstimateRequest::new("serum", ["Water", "Glycerin", "Niacinamide"])).unwrap();
    assert_valid(&r);
    assert_eq!(r.meta.line_position, None);
    assert_eq!(r.summary.sub_line, 0);
    assert_eq!(r.summary.interpolated, 2);
}

#[test]
fn profile_specific_usage_range_applies() {
    let list = ["Water", "Phenoxyethanol", "Glycerin"];
    let toner = run(&context(), &EstimateRequest::new("toner", list)).unwrap();
    let serum = run(&context(), &EstimateRequest::new("serum", list)).unwrap();
    assert_valid(&toner);
    assert_valid(&serum);
    // Glycerin's midpoint exceeds 1 in both profiles, so both cap.
    assert_eq!(toner.slots[2].percentage, 1.0);
    assert_eq!(serum.slots[2].percentage, 1.0);
    assert_eq!(toner.meta.profile, "toner");
}

#[test]
fn parallel_requests_share_one_context() {
    let ctx = context();
    let request = EstimateRequest::new("cream", ["Water", "Glycerin", "Panthenol", "Allantoin", "Phenoxyethanol"]);
    let expected = run(&ctx, &request).unwrap().percentages();

    let (ctx, request) = (&ctx, &request);
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(move || run(ctx, request).unwrap().percentages()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}

#[test]
fn result_serializes_with_snake_case_sources() {
    let request = EstimateRequest::new("serum", ["Water", "Niacinamide", "Phenoxyethanol", "Madecassoside"])
        .with_known("Niacinamide", 5.0);
    let r = run(&context(), &request).unwrap();
    let json = serde_json::to_value(&r).unwrap();

    assert_eq!(json["meta"]["context_name"], "Skincare Defaults");
    assert_eq!(json["slots"][0]["source"], "base");
    assert_eq!(json["slots"][1]["source"], "anchor");
    assert_eq!(json["slots"][2]["source"], "sub_line");
    assert_eq!(json["notes"][0]["kind"], "unresolved_identity");
    assert_eq!(json["summary"]["total_slots"], 4);
}

// -------------------------------------------------------------------------
// Declaration text and pluggable resolution
// -------------------------------------------------------------------------

#[test]
fn declaration_text_runs_end_to_end() {
    let text = "Ingredients: Aqua (Water), Glycerin, Niacinamide, Sodium Hyaluronate,\n\
                Phenoxyethanol, Ethylhexylglycerin, Citric Acid.";
    let names = split_declaration(text);
    assert_eq!(names.len(), 7);

    let request = EstimateRequest::new("serum", names).with_known("Niacinamide", 4.0);
    let r = run(&context(), &request).unwrap();
    assert_valid(&r);
    assert_eq!(r.slots[0].identity.as_deref(), Some("water"));
    assert_eq!(r.meta.line_position, Some(4));
    assert_eq!(r.summary.sub_line, 3);
}

/// Resolves only what its table lists, by exact lowercase name.
struct TableResolver(Vec<(&'static str, &'static str)>);

impl IdentityResolver for TableResolver {
    fn resolve(&self, raw_name: &str) -> Resolution {
        let name = raw_name.trim().to_lowercase();
        match self.0.iter().find(|(from, _)| *from == name) {
            Some((_, to)) => Resolution {
                identity: Some(to.to_string()),
                score: 100.0,
                method: MatchMethod::Exact,
            },
            None => Resolution::unresolved(),
        }
    }
}

#[test]
fn caller_supplied_resolver_drives_identities() {
    // "Conservateur" only becomes a marker through the custom table.
    let resolver = TableResolver(vec![("eau", "water"), ("conservateur", "phenoxyethanol")]);
    let request = EstimateRequest::new("serum", ["Eau", "Glycerin", "Conservateur"]);
    let r = reconstruct(&context(), &request, &resolver).unwrap();
    assert_valid(&r);
    assert_eq!(r.slots[0].identity.as_deref(), Some("water"));
    assert_eq!(r.slots[1].identity, None);
    assert_eq!(r.meta.line_position, Some(2));
    assert_eq!(r.slots[2].percentage, 0.75);
}
