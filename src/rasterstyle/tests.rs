// src/rasterstyle/tests.rs

use super::*;
use crate::config::RasterStyleConfig;
use crate::setup;
use test_log::test;

fn build_json(json: &str) -> RasterStyle {
    let config = RasterStyleConfig::from_json(json).unwrap();
    setup::build(&config).unwrap()
}

fn cmyk_composite() -> RasterStyle {
    build_json("{}")
}

fn colorant_named(rs: &RasterStyle, name: &str) -> ColorantId {
    rs.tree()
        .all_colorants()
        .find(|(_, c)| c.info().name == name)
        .map(|(id, _)| id)
        .unwrap_or_else(|| panic!("no colorant named {name}"))
}

fn channel_names(rs: &RasterStyle) -> Vec<String> {
    rs.tree()
        .all_channels()
        .map(|(_, ch)| ch.name().to_string())
        .collect()
}

// --- Index Management ---

#[test]
fn process_colorants_are_allocated_in_model_order() {
    let rs = cmyk_composite();
    for (i, name) in ["Cyan", "Magenta", "Yellow", "Black"].iter().enumerate() {
        assert_eq!(rs.colorant_index(name), ColorantIndex::new(i as u32));
        assert_eq!(rs.colorant_name(ColorantIndex::new(i as u32)), Some(*name));
    }
    assert_eq!(rs.colorant_name(ColorantIndex::NONE), Some("None"));
    assert_eq!(rs.colorant_name(ColorantIndex::ALL), Some("All"));
    assert_eq!(rs.colorant_name(ColorantIndex::UNKNOWN), None);
}

#[test]
fn possibly_new_name_reserves_and_bumps_the_generation() {
    let mut rs = cmyk_composite();
    let before = rs.generation();
    let gold = rs.possibly_new_name("Gold").unwrap();
    assert!(gold.is_real());
    assert!(rs.generation() > before);
    assert_eq!(rs.colorant_index("Gold"), ColorantIndex::UNKNOWN);
    assert_eq!(rs.colorant_index_reserved("Gold"), gold);
    assert!(!rs.is_fully_fledged(gold));

    let again = rs.generation();
    assert_eq!(rs.possibly_new_name("Gold").unwrap(), gold);
    assert_eq!(rs.generation(), again, "known names change nothing");
}

#[test]
fn promotion_carries_every_synonym() {
    let mut rs = cmyk_composite();
    let gold = rs.possibly_new_name("Gold").unwrap();
    assert_eq!(rs.synonym("Or", "Gold").unwrap(), gold);
    assert_eq!(rs.colorant_index("Or"), ColorantIndex::UNKNOWN);

    assert_eq!(rs.possibly_new_separation("Gold").unwrap(), gold);
    assert_eq!(rs.colorant_index("Gold"), gold);
    assert_eq!(rs.colorant_index("Or"), gold);
    assert!(rs.reserved().names_for(gold).next().is_none());
}

#[test]
fn synonym_of_unknown_name_reserves_it() {
    let mut rs = cmyk_composite();
    let index = rs.synonym("Silber", "Silver").unwrap();
    assert_eq!(rs.colorant_index_reserved("Silver"), index);
    assert_eq!(rs.colorant_index_reserved("Silber"), index);
    assert_eq!(rs.colorant_index("Silber"), ColorantIndex::UNKNOWN);

    let black = rs.synonym("Schwarz", "Black").unwrap();
    assert_eq!(rs.colorant_index("Schwarz"), black);
    assert_eq!(black, rs.colorant_index("Black"));
}

#[test]
fn colorant_mappings_and_their_inverse() {
    let mut rs = cmyk_composite();
    let cyan = rs.colorant_index("Cyan");
    let magenta = rs.colorant_index("Magenta");
    let violet = rs.possibly_new_name("Violet").unwrap();
    let light_cyan = rs.possibly_new_name("LightCyan").unwrap();

    rs.set_colorant_mapping(violet, &[cyan, magenta]).unwrap();
    assert_eq!(rs.get_colorant_mapping(violet), Some(&[cyan, magenta][..]));
    assert_eq!(rs.get_inverse_colorant(cyan), ColorantIndex::UNKNOWN);

    rs.set_colorant_mapping(light_cyan, &[cyan]).unwrap();
    assert_eq!(rs.get_inverse_colorant(cyan), light_cyan);

    rs.set_colorant_mapping(light_cyan, &[]).unwrap();
    assert_eq!(rs.get_colorant_mapping(light_cyan), None);

    assert!(rs.set_colorant_mapping(ColorantIndex::NONE, &[cyan]).is_err());
    assert!(rs.set_colorant_mapping(violet, &[ColorantIndex::ALL]).is_err());
}

#[test]
fn name_override_keeps_the_original_name() {
    let mut rs = cmyk_composite();
    let cyan = rs.colorant_index("Cyan");
    rs.override_colorant_name(cyan, "Process Cyan").unwrap();

    let id = colorant_named(&rs, "Process Cyan");
    let info = rs.tree().colorant(id).unwrap().info();
    assert_eq!(info.original_name.as_deref(), Some("Cyan"));
    assert_eq!(info.index, cyan);
    assert_eq!(rs.colorant_index("Process Cyan"), cyan);
    assert_eq!(rs.colorant_index("Cyan"), cyan);

    assert!(rs.override_colorant_name(ColorantIndex::NONE, "X").is_err());
    assert!(rs.override_colorant_name(ColorantIndex::new(40), "X").is_err());
}

// --- Automatic Separations ---

#[test]
fn automatic_separation_appends_a_composite_channel() {
    let mut rs = build_json(
        r#"{ "ProcessColorModel": "DeviceRGB", "ColorChannels": ["Red", "Green", "Blue"] }"#,
    );
    let orange = rs.add_automatic_separation("Orange").unwrap();
    assert!(rs.is_fully_fledged(orange));
    assert_eq!(channel_names(&rs), vec!["Red", "Green", "Blue", "Orange"]);
    assert_eq!(rs.tree().sheet_count(), 1);

    let id = colorant_named(&rs, "Orange");
    let colorant = rs.tree().colorant(id).unwrap();
    assert_eq!(colorant.info().colorant_type, ColorantType::Spot);
    assert_eq!(rs.tree().channel(colorant.channel()).unwrap().render_index(), 3);

    let count = rs.tree().channel_count();
    assert_eq!(rs.add_automatic_separation("Orange").unwrap(), orange);
    assert_eq!(rs.tree().channel_count(), count, "existing separations are reused");
}

#[test]
fn automatic_separation_reuses_a_blank_channel() {
    let mut rs = build_json(
        r#"{ "ColorChannels": ["Cyan", "Magenta", "Yellow", "Black", ""] }"#,
    );
    assert_eq!(rs.tree().channel_count(), 5);
    rs.add_automatic_separation("Orange").unwrap();
    assert_eq!(rs.tree().channel_count(), 5);

    let id = colorant_named(&rs, "Orange");
    let channel = rs.tree().channel(rs.tree().colorant(id).unwrap().channel()).unwrap();
    assert_eq!(channel.name(), "");
    assert_eq!(channel.colorants().len(), 1);
    assert!(!channel.has_blank_colorants());
}

#[test]
fn refused_automatic_separations() {
    let mut rs = build_json(r#"{ "SeparationDetails": { "Add": false } }"#);
    assert_eq!(rs.add_automatic_separation("Orange").unwrap(), ColorantIndex::NONE);
    assert_eq!(rs.colorant_index("Orange"), ColorantIndex::UNKNOWN);

    let mut rs = build_json(r#"{ "SeparationDetails": { "Add": false, "Abort": true } }"#);
    let err = rs.add_automatic_separation("Orange").unwrap_err();
    assert!(matches!(err, RasterStyleError::Config { .. }));
}

#[test]
fn monochrome_output_refuses_automatic_separations() {
    const GRAY_MONO: &str = r#"{ "ProcessColorModel": "DeviceGray", "SeparationStyle": 0,
                                 "InterleavingStyle": 1, "SeparationOrder": ["Gray"] }"#;
    let mut rs = build_json(GRAY_MONO);
    assert_eq!(rs.add_automatic_separation("Gold").unwrap(), ColorantIndex::NONE);
    assert_eq!(rs.tree().sheet_count(), 1);
    assert_eq!(rs.tree().channel_count(), 1);
    assert_eq!(rs.colorant_index("Gold"), ColorantIndex::UNKNOWN);

    let mut config = RasterStyleConfig::from_json(GRAY_MONO).unwrap();
    config.separation_details.abort = true;
    let mut rs = setup::build(&config).unwrap();
    let err = rs.add_automatic_separation("Gold").unwrap_err();
    assert!(matches!(err, RasterStyleError::Config { .. }));
    assert_eq!(rs.tree().sheet_count(), 1);
}

#[test]
fn automatic_separation_on_separated_output_adds_a_sheet() {
    let mut rs = build_json(
        r#"{ "SeparationStyle": 1, "InterleavingStyle": 4,
             "SeparationOrder": ["Cyan", "Magenta"] }"#,
    );
    assert_eq!(rs.tree().sheet_count(), 2);
    let gold = rs.add_automatic_separation("Gold").unwrap();
    assert_eq!(rs.tree().sheet_count(), 3);

    let last = *rs.tree().sheets().last().unwrap();
    let sheet = rs.tree().sheet(last).unwrap();
    assert_eq!(sheet.sequence(), 2);
    let (channel, _) = rs.tree().channels_of(last).next().unwrap();
    let (_, colorant) = rs.tree().colorants_of(channel).next().unwrap();
    assert_eq!(colorant.index(), gold);
}

#[test]
fn extra_spot_type_comes_from_colorant_details() {
    let mut rs = build_json(
        r#"{ "ColorantDetails": { "Varnish": { "ColorantType": "ExtraSpot", "SpecialHandling": "Opaque" } } }"#,
    );
    rs.add_automatic_separation("Varnish").unwrap();
    let id = colorant_named(&rs, "Varnish");
    let info = rs.tree().colorant(id).unwrap().info();
    assert_eq!(info.colorant_type, ColorantType::ExtraSpot);
    assert_eq!(info.special_handling, crate::colorant::SpecialHandling::Opaque);
}

// --- Removal ---

#[test]
fn clearing_a_colorant_removes_its_channel() {
    let mut rs = cmyk_composite();
    let magenta = rs.colorant_index("Magenta");
    let before = rs.generation();
    assert!(rs.clear_colorant(magenta).unwrap());

    assert!(rs.generation() > before);
    assert_eq!(channel_names(&rs), vec!["Cyan", "Yellow", "Black"]);
    assert_eq!(rs.colorant_index("Magenta"), ColorantIndex::UNKNOWN);
    assert_eq!(rs.colorant_index_reserved("Magenta"), magenta);
    let indices: Vec<u32> = rs
        .tree()
        .all_channels()
        .map(|(_, ch)| ch.render_index())
        .collect();
    assert_eq!(indices, vec![0, 1, 2]);

    assert!(!rs.clear_colorant(magenta).unwrap(), "nothing left to clear");
}

#[test]
fn required_channel_keeps_an_anonymous_colorant() {
    let mut rs = build_json(r#"{ "ColorantPresence": { "Cyan": "MustBePresent" } }"#);
    let cyan = rs.colorant_index("Cyan");
    let id = colorant_named(&rs, "Cyan");
    let channel = rs.tree().colorant(id).unwrap().channel();

    assert!(rs.clear_colorant(cyan).unwrap());
    let ch = rs.tree().channel(channel).expect("required channel survives");
    assert!(ch.is_required());
    assert!(ch.has_blank_colorants());
    let (_, colorant) = rs.tree().colorants_of(channel).next().unwrap();
    assert_eq!(colorant.index(), ColorantIndex::NONE);
    assert_eq!(colorant.info().name, "None");
}

#[test]
fn clearing_a_separation_drops_its_sheet() {
    let mut rs = build_json(
        r#"{ "SeparationStyle": 1, "InterleavingStyle": 4,
             "SeparationOrder": ["Cyan", "Magenta"] }"#,
    );
    let cyan = rs.colorant_index("Cyan");
    assert!(rs.clear_colorant(cyan).unwrap());
    assert_eq!(rs.tree().sheet_count(), 1);
    assert_eq!(rs.tree().sheet(rs.tree().sheets()[0]).unwrap().sequence(), 0);
}

#[test]
fn clearing_a_separation_drops_a_sheet_left_with_placeholders() {
    let mut rs = build_json(
        r#"{ "SeparationStyle": 2, "InterleavingStyle": 3,
             "ColorChannels": ["Cyan", "Magenta", "Yellow", "Black"],
             "SeparationOrder": ["Cyan", "Magenta"] }"#,
    );
    assert_eq!(rs.tree().sheet_count(), 2);
    let cyan = rs.colorant_index("Cyan");
    let magenta = rs.colorant_index("Magenta");

    assert!(rs.clear_colorant(cyan).unwrap());
    assert_eq!(rs.tree().sheet_count(), 1);
    let sheet = rs.tree().sheets()[0];
    let real: Vec<ColorantIndex> = rs
        .tree()
        .channels_of(sheet)
        .flat_map(|(ch, _)| rs.tree().colorants_of(ch).map(|(_, c)| c.index()))
        .filter(|i| i.is_real())
        .collect();
    assert_eq!(real, vec![magenta]);

    rs.mark_blank_separations(&ColorantSet::new(), &ColorantSet::new());
    assert_eq!(rs.sheets_to_render(), 1);
}

#[test]
fn placeholder_sheet_with_a_required_channel_is_kept() {
    let mut rs = build_json(
        r#"{ "SeparationStyle": 2, "InterleavingStyle": 3,
             "ColorChannels": ["Cyan", "Magenta", "Yellow", "Black"],
             "SeparationOrder": ["Cyan", "Magenta"],
             "ColorantPresence": { "Black": "MustBePresent" } }"#,
    );
    let cyan = rs.colorant_index("Cyan");
    assert!(rs.clear_colorant(cyan).unwrap());
    assert_eq!(rs.tree().sheet_count(), 2);
}

#[test]
fn composite_sheet_is_never_deleted() {
    let mut rs = build_json(
        r#"{ "ProcessColorModel": "DeviceGray", "InterleavingStyle": 4 }"#,
    );
    let gray = rs.colorant_index("Gray");
    assert!(rs.clear_colorant(gray).unwrap());
    assert_eq!(rs.tree().sheet_count(), 1);
    assert_eq!(rs.tree().channel_count(), 0);
}

#[test]
fn remove_false_protects_setup_colorants_only() {
    let mut rs = build_json(r#"{ "SeparationDetails": { "Remove": false } }"#);
    let cyan = rs.colorant_index("Cyan");
    assert!(!rs.clear_colorant(cyan).unwrap());
    assert_eq!(rs.colorant_index("Cyan"), cyan);

    let gold = rs.add_automatic_separation("Gold").unwrap();
    let silver = rs.add_automatic_separation("Silver").unwrap();
    assert_eq!(rs.clear_automatic().unwrap(), 2);
    assert_eq!(rs.colorant_index("Gold"), ColorantIndex::UNKNOWN);
    assert!(!rs.tree().contains_index(gold));
    assert!(!rs.tree().contains_index(silver));
    assert_eq!(rs.tree().channel_count(), 4);
}

// --- Attributes ---

#[test]
fn per_name_attributes_are_filled_in() {
    let rs = build_json(
        r#"{ "DefaultScreenAngles": { "Black": { "Angle": 60.0, "Override": true } },
             "ColorantDetails": { "Cyan": { "NeutralDensity": 0.61 } } }"#,
    );
    let cyan = rs.tree().colorant(colorant_named(&rs, "Cyan")).unwrap().info();
    assert_eq!(cyan.screen_angle.angle, 15.0);
    assert!(!cyan.screen_angle.overrides);
    assert_eq!(cyan.neutral_density, Some(0.61));
    assert_eq!(cyan.colorant_type, ColorantType::Process);
    assert_eq!(cyan.srgb, Some([0.0, 1.0, 1.0]));
    assert_eq!(cyan.cmyk, Some([1.0, 0.0, 0.0, 0.0]));

    let black = rs.tree().colorant(colorant_named(&rs, "Black")).unwrap().info();
    assert_eq!(black.screen_angle.angle, 60.0);
    assert!(black.screen_angle.overrides);
}

#[test]
fn boolean_srgb_means_no_equivalents() {
    let mut rs = build_json(r#"{ "sRGB": true }"#);
    let cyan_id = colorant_named(&rs, "Cyan");
    assert_eq!(rs.tree().colorant(cyan_id).unwrap().info().srgb, None);

    let cyan = rs.colorant_index("Cyan");
    rs.set_colorant_srgb(cyan, [0.1, 0.6, 0.9]);
    rs.set_colorant_cmyk(cyan, [0.9, 0.1, 0.0, 0.0]);
    let info = rs.tree().colorant(cyan_id).unwrap().info();
    assert_eq!(info.srgb, Some([0.1, 0.6, 0.9]));
    assert_eq!(info.cmyk, Some([0.9, 0.1, 0.0, 0.0]));
}

#[test]
fn offsets_derive_the_band_and_placement_order() {
    let mut rs = build_json(r#"{ "BandHeight": 100 }"#);
    let cyan = colorant_named(&rs, "Cyan");
    rs.set_colorant_offset(cyan, 5, 250);
    assert_eq!(rs.tree().colorant(cyan).unwrap().info().offset_band, 2);

    rs.set_band_height(0);
    assert_eq!(rs.tree().colorant(cyan).unwrap().info().offset_band, 0);
    rs.set_band_height(50);
    assert_eq!(rs.tree().colorant(cyan).unwrap().info().offset_band, 5);
}

#[test]
fn device_indices_are_looked_up_once() {
    let rs = build_json(
        r#"{ "Photoink": ["LightCyan", "LightMagenta"],
             "ColorantMappings": { "LightCyan": ["Cyan"] } }"#,
    );
    assert_eq!(rs.black_index(), rs.colorant_index("Black"));
    assert_eq!(rs.photoink_indices().len(), 2);
    assert_eq!(rs.photoink_indices()[0], rs.colorant_index_reserved("LightCyan"));
    let light_cyan = rs.colorant_index_reserved("LightCyan");
    assert_eq!(
        rs.get_colorant_mapping(light_cyan),
        Some(&[rs.colorant_index("Cyan")][..])
    );
}

// --- Copying and Sharing ---

#[test]
fn deep_copy_is_independent() {
    let rs = cmyk_composite();
    let mut copy = rs.deep_copy().unwrap();
    assert_ne!(copy.id(), rs.id());
    assert_eq!(copy.generation(), rs.generation());

    copy.add_automatic_separation("Gold").unwrap();
    assert_eq!(rs.colorant_index("Gold"), ColorantIndex::UNKNOWN);
    assert_eq!(rs.tree().channel_count(), 4);
    assert_eq!(copy.tree().channel_count(), 5);
}

#[test]
fn backdrop_holds_a_reference_to_its_parent() {
    let device = RasterStyleHandle::new(cmyk_composite());
    assert_eq!(device.ref_count(), 1);

    let backdrop = setup::build_backdrop(&device, &setup::BackdropConfig::default()).unwrap();
    assert_eq!(device.ref_count(), 2);
    assert!(backdrop.parent().unwrap().ptr_eq(&device));

    let copy = backdrop.deep_copy().unwrap();
    assert!(!copy.parent().unwrap().ptr_eq(&device), "parent chain is copied");
    assert_eq!(device.ref_count(), 2);

    drop(backdrop);
    assert_eq!(device.ref_count(), 1);
}

#[test]
fn ids_are_unique() {
    let a = cmyk_composite();
    let b = cmyk_composite();
    assert_ne!(a.id(), b.id());
    assert_ne!(a.id().value(), 0);
}
