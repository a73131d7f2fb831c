use super::*;
use crate::{
    document::model::{DocumentDef, LayerDef},
    document::store::{DocumentTemplate, LoadOptions},
    foundation::core::Vec2,
};

fn template(layers: Vec<LayerDef>) -> DocumentTemplate {
    let def = DocumentDef {
        canvas: Canvas {
            width: 4,
            height: 4,
        },
        layers,
    };
    DocumentTemplate::from_def(&def, ".", &LoadOptions::default()).unwrap()
}

fn show(doc: &mut LayeredDocument, names: &[&str]) {
    // Walks one level of groups, enough for these fixtures.
    for name in names {
        let id = doc
            .find_layer(name, None)
            .or_else(|_| {
                doc.roots()
                    .iter()
                    .find_map(|g| doc.find_layer(name, Some(*g)).ok())
                    .ok_or(())
            })
            .unwrap();
        doc.set_visible(id, true);
    }
}

#[test]
fn nothing_visible_renders_transparent_canvas() {
    let doc = template(vec![LayerDef::fill("red", [255, 0, 0, 255])]).instantiate();
    let img = render(&doc).unwrap();
    assert_eq!((img.width, img.height), (4, 4));
    assert!(img.data.iter().all(|b| *b == 0));
}

#[test]
fn later_siblings_paint_over_earlier_ones() {
    let t = template(vec![
        LayerDef::fill("red", [255, 0, 0, 255]),
        LayerDef::fill("blue", [0, 0, 255, 255]),
    ]);
    let mut doc = t.instantiate();
    show(&mut doc, &["red", "blue"]);
    let img = render(&doc).unwrap();
    assert_eq!(img.straight_pixel(0, 0), Some([0, 0, 255, 255]));

    let mut only_red = t.instantiate();
    show(&mut only_red, &["red"]);
    assert_eq!(
        render(&only_red).unwrap().straight_pixel(3, 3),
        Some([255, 0, 0, 255])
    );
}

#[test]
fn hidden_group_hides_visible_children() {
    let t = template(vec![LayerDef::group(
        "background",
        vec![LayerDef::fill("red", [255, 0, 0, 255])],
    )]);
    let mut doc = t.instantiate();
    show(&mut doc, &["red"]);
    assert!(render(&doc).unwrap().data.iter().all(|b| *b == 0));

    show(&mut doc, &["background"]);
    assert_eq!(
        render(&doc).unwrap().straight_pixel(1, 1),
        Some([255, 0, 0, 255])
    );
}

#[test]
fn offsets_are_clipped_to_the_canvas() {
    let t = template(vec![
        LayerDef::fill("shifted", [0, 255, 0, 255]).with_offset(Vec2::new(1.0, 1.0)),
        LayerDef::fill("corner", [255, 0, 0, 255]).with_offset(Vec2::new(-3.0, -3.0)),
        LayerDef::fill("gone", [0, 0, 255, 255]).with_offset(Vec2::new(10.0, 0.0)),
    ]);
    let mut doc = t.instantiate();
    show(&mut doc, &["shifted", "corner", "gone"]);
    let img = render(&doc).unwrap();
    assert_eq!(img.straight_pixel(0, 0), Some([255, 0, 0, 255]));
    assert_eq!(img.straight_pixel(1, 0), Some([0, 0, 0, 0]));
    assert_eq!(img.straight_pixel(1, 1), Some([0, 255, 0, 255]));
    assert_eq!(img.straight_pixel(3, 3), Some([0, 255, 0, 255]));
    assert_eq!(img.straight_pixel(4, 0), None);
}

#[test]
fn layer_opacity_blends_over_lower_layers() {
    let t = template(vec![
        LayerDef::fill("blue", [0, 0, 255, 255]),
        LayerDef::fill("red", [255, 0, 0, 255]).with_opacity(0.5),
    ]);
    let mut doc = t.instantiate();
    show(&mut doc, &["blue", "red"]);
    let px = render(&doc).unwrap().straight_pixel(2, 2).unwrap();
    assert_eq!(px, [128, 0, 127, 255]);
}

#[test]
fn rendering_the_same_state_twice_is_byte_identical() {
    let t = template(vec![
        LayerDef::fill("a", [10, 200, 30, 180]),
        LayerDef::fill("b", [250, 20, 90, 77]).with_offset(Vec2::new(1.0, 2.0)),
    ]);
    let mut doc = t.instantiate();
    show(&mut doc, &["a", "b"]);
    let first = render(&doc).unwrap();
    let second = render(&doc).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_straight_rgba8().len(), first.data.len());
}
