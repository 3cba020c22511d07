// src/setup/tests.rs

use super::*;
use crate::colorant::ColorantType;
use crate::rasterstyle::Tree;
use test_log::test;

fn build_json(json: &str) -> Result<RasterStyle> {
    build(&RasterStyleConfig::from_json(json).unwrap())
}

/// Names bound to each channel, sheet by sheet.
fn layout(tree: &Tree) -> Vec<Vec<(String, String)>> {
    tree.sheets()
        .iter()
        .map(|&sheet| {
            tree.channels_of(sheet)
                .flat_map(|(ch, channel)| {
                    tree.colorants_of(ch)
                        .map(move |(_, c)| (channel.name().to_string(), c.info().name.clone()))
                })
                .collect()
        })
        .collect()
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect()
}

#[test]
fn cmyk_separations_get_one_sheet_each() {
    let rs = build_json(
        r#"{ "ProcessColorModel": "DeviceCMYK", "SeparationStyle": 1, "InterleavingStyle": 4,
             "SeparationOrder": ["Cyan", "Magenta", "Yellow", "Black"],
             "ColorChannels": ["Gray"],
             "ColorantPresence": { "Cyan": "MustBePresent", "Magenta": "MustBePresent",
                                   "Yellow": "MustBePresent", "Black": "MustBePresent" } }"#,
    )
    .unwrap();

    let tree = rs.tree();
    assert_eq!(tree.sheet_count(), 4);
    for (seq, (&sheet, name)) in tree
        .sheets()
        .iter()
        .zip(["Cyan", "Magenta", "Yellow", "Black"])
        .enumerate()
    {
        let s = tree.sheet(sheet).unwrap();
        assert_eq!(s.sequence() as usize, seq);
        assert_eq!(s.channels().len(), 1);
        assert_eq!(s.required_channels(), 1);
        let (ch, channel) = tree.channels_of(sheet).next().unwrap();
        assert!(channel.is_required());
        let (_, colorant) = tree.colorants_of(ch).next().unwrap();
        assert_eq!(colorant.index(), rs.colorant_index(name));
        assert_eq!(colorant.index(), ColorantIndex::new(seq as u32));
        assert_eq!(colorant.info().colorant_type, ColorantType::Process);
    }
}

#[test]
fn unrequested_process_colorants_stay_reserved() {
    let rs = build_json(
        r#"{ "SeparationStyle": 1, "InterleavingStyle": 4, "SeparationOrder": ["Cyan"] }"#,
    )
    .unwrap();
    assert_eq!(rs.tree().sheet_count(), 1);
    assert!(rs.colorant_index("Cyan").is_real());
    for name in ["Magenta", "Yellow", "Black"] {
        assert_eq!(rs.colorant_index(name), ColorantIndex::UNKNOWN);
        assert!(rs.colorant_index_reserved(name).is_real());
    }
}

#[test]
fn colored_separations_prefer_the_matching_channel() {
    let rs = build_json(
        r#"{ "SeparationStyle": 2, "InterleavingStyle": 4,
             "SeparationOrder": ["Cyan", "Black"],
             "ColorChannels": ["Cyan", "Magenta", "Yellow", "Black"] }"#,
    )
    .unwrap();
    assert_eq!(
        layout(rs.tree()),
        vec![
            pairs(&[("Cyan", "Cyan"), ("Magenta", "None"), ("Yellow", "None"), ("Black", "None")]),
            pairs(&[("Cyan", "None"), ("Magenta", "None"), ("Yellow", "None"), ("Black", "Black")]),
        ]
    );
}

#[test]
fn black_channel_outranks_gray() {
    let json = r#"{ "SeparationStyle": 1, "InterleavingStyle": 4,
                    "SeparationOrder": ["Orange"], "ColorChannels": ["Gray", "Black"] }"#;
    let rs = build_json(json).unwrap();
    assert_eq!(layout(rs.tree()), vec![pairs(&[("Gray", "None"), ("Black", "Orange")])]);

    let mut config = RasterStyleConfig::from_json(json).unwrap();
    config.channel_mapping.black = None;
    let rs = build(&config).unwrap();
    assert_eq!(layout(rs.tree()), vec![pairs(&[("Gray", "Orange"), ("Black", "None")])]);
}

#[test]
fn declared_black_only_applies_to_plain_separations() {
    let json = r#"{ "SeparationStyle": 1, "InterleavingStyle": 4, "SeparationOrder": ["Black"],
                    "ColorChannels": ["Spare", "Key"], "ProcessColorant_Black": "Key" }"#;
    let rs = build_json(json).unwrap();
    assert_eq!(layout(rs.tree()), vec![pairs(&[("Spare", "None"), ("Key", "Black")])]);

    let mut config = RasterStyleConfig::from_json(json).unwrap();
    config.separation_style = SeparationStyle::ColoredSeparations;
    let rs = build(&config).unwrap();
    assert_eq!(layout(rs.tree()), vec![pairs(&[("Spare", "Black"), ("Key", "None")])]);
}

#[test]
fn every_channel_sharing_the_best_score_is_bound() {
    let rs = build_json(
        r#"{ "SeparationStyle": 1, "InterleavingStyle": 4, "SeparationOrder": ["Cyan"],
             "ColorChannels": ["Black", "Gray"],
             "ChannelMapping": { "Black": 1, "Gray": 1, "FirstChannel": 4 } }"#,
    )
    .unwrap();
    assert_eq!(layout(rs.tree()), vec![pairs(&[("Black", "Cyan"), ("Gray", "Cyan")])]);
}

#[test]
fn composite_binds_only_ordered_channels() {
    let rs = build_json(r#"{ "SeparationOrder": ["Cyan", "Black"] }"#).unwrap();
    assert_eq!(
        layout(rs.tree()),
        vec![pairs(&[
            ("Cyan", "Cyan"),
            ("Magenta", "None"),
            ("Yellow", "None"),
            ("Black", "Black"),
        ])]
    );
    assert_eq!(rs.colorant_index("Magenta"), ColorantIndex::UNKNOWN);
}

#[test]
fn preassigned_indices_are_respected() {
    let rs = build_json(
        r#"{ "FullyFledgedColorants": { "Gold": 10 }, "ReservedColorants": { "Silver": 12 } }"#,
    )
    .unwrap();
    assert_eq!(rs.colorant_index("Gold"), ColorantIndex::new(10));
    assert_eq!(rs.colorant_index_reserved("Silver"), ColorantIndex::new(12));
    assert_eq!(rs.colorant_index("Cyan"), ColorantIndex::new(13));
}

#[test]
fn out_of_range_preassigned_index_is_rejected() {
    let err = build_json(r#"{ "ReservedColorants": { "Bad": 4294967295 } }"#).unwrap_err();
    assert!(matches!(err, RasterStyleError::Range { field: "ReservedColorants", .. }));
}

#[test]
fn invalid_configuration_builds_nothing() {
    let err = build_json(
        r#"{ "SeparationStyle": 0, "InterleavingStyle": 1, "SeparationOrder": ["Black"],
             "ColorChannels": ["Gray", "Black"] }"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("monochrome"));
}

#[test]
fn backdrops_are_pixel_interleaved_composites() {
    let parent = RasterStyleHandle::new(build_json(r#"{ "SeparationStyle": 1, "InterleavingStyle": 4, "SeparationOrder": ["Black"] }"#).unwrap());
    let backdrop = build_backdrop(
        &parent,
        &BackdropConfig {
            colorants: vec!["Gray".into()],
            process_color_model: ProcessColorModel::Gray,
            ..BackdropConfig::default()
        },
    )
    .unwrap();
    assert!(backdrop.is_backdrop());
    assert_eq!(backdrop.interleaving_style(), InterleavingStyle::Pixel);
    assert_eq!(backdrop.separation_style(), SeparationStyle::Composite);
    assert_eq!(backdrop.values_per_component(), 65536);
    assert_eq!(layout(backdrop.tree()), vec![pairs(&[("Gray", "Gray")])]);

    let spot_group = build_backdrop(
        &parent,
        &BackdropConfig {
            colorants: vec!["Orange".into(), "Green".into()],
            process_color_model: ProcessColorModel::DeviceN,
            ..BackdropConfig::default()
        },
    )
    .unwrap();
    assert_eq!(
        layout(spot_group.tree()),
        vec![pairs(&[("Orange", "Orange"), ("Green", "Green")])]
    );

    let halftoned = build_backdrop(
        &parent,
        &BackdropConfig {
            values_per_component: 16,
            ..BackdropConfig::default()
        },
    );
    assert!(halftoned.is_err());
}
