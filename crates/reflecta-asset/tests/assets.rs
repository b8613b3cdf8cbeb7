use reflecta_asset::{AssetConfig, AssetManager};
use reflecta_core::{
    impl_marshal, AsAny, ClassBundle, Reflect, ReflectionPtr, RegistryBuilder, TypeRegistry,
    TypedField, VecArray,
};
use serde_json::json;
use std::fs;

trait Curve: AsAny {
    fn sample(&self, t: f32) -> f32;
}

#[derive(Debug, Default, PartialEq)]
struct Linear {
    slope: f32,
}

impl Reflect for Linear {
    const TYPE_NAME: &'static str = "Linear";
}

impl Curve for Linear {
    fn sample(&self, t: f32) -> f32 {
        self.slope * t
    }
}

#[derive(Default)]
struct Clip {
    name: String,
    frames: Vec<f32>,
    curve: ReflectionPtr<dyn Curve>,
}

impl Reflect for Clip {
    const TYPE_NAME: &'static str = "Clip";
}

impl_marshal!(Linear, Clip);

fn registry() -> TypeRegistry {
    let mut builder = RegistryBuilder::new();
    builder.register_field(
        "Linear",
        TypedField::new(
            "Linear",
            "slope",
            "f32",
            |l: &Linear| &l.slope,
            |l: &mut Linear| &mut l.slope,
        ),
    );
    builder.register_class(
        "Linear",
        ClassBundle::<Linear>::new().with_upcast::<dyn Curve>(|l| l),
    );

    builder.register_array("Vec<f32>", VecArray::<f32>::new("Vec<f32>", "f32"));
    builder.register_field(
        "Clip",
        TypedField::new("Clip", "name", "String", |c: &Clip| &c.name, |c: &mut Clip| &mut c.name),
    );
    builder.register_field(
        "Clip",
        TypedField::new(
            "Clip",
            "frames",
            "Vec<f32>",
            |c: &Clip| &c.frames,
            |c: &mut Clip| &mut c.frames,
        )
        .array(),
    );
    builder.register_field(
        "Clip",
        TypedField::new(
            "Clip",
            "curve",
            "ReflectionPtr<Curve>",
            |c: &Clip| &c.curve,
            |c: &mut Clip| &mut c.curve,
        ),
    );
    builder.register_class("Clip", ClassBundle::<Clip>::new());
    builder.build()
}

fn sample_clip() -> Clip {
    Clip {
        name: "walk".to_string(),
        frames: vec![0.0, 0.5, 1.0],
        curve: ReflectionPtr::new("Linear", Box::new(Linear { slope: 2.0 })),
    }
}

#[test]
fn test_asset_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let manager = AssetManager::new(AssetConfig::new(dir.path()), registry());

    assert!(manager.save_asset(&sample_clip(), "anim/walk.json"));

    let text = fs::read_to_string(dir.path().join("anim/walk.json")).unwrap();
    let on_disk: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        on_disk,
        json!({
            "name": "walk",
            "frames": [0.0, 0.5, 1.0],
            "curve": {"$typeName": "Linear", "$context": {"slope": 2.0}}
        })
    );

    let mut clip = Clip::default();
    assert!(manager.load_asset("anim/walk.json", &mut clip));
    assert_eq!(clip.name, "walk");
    assert_eq!(clip.frames, vec![0.0, 0.5, 1.0]);
    assert_eq!(clip.curve.type_name(), "Linear");
    assert_eq!(clip.curve.get().map(|c| c.sample(3.0)), Some(6.0));
}

#[test]
fn test_load_into_initialized_slot_fails() {
    let dir = tempfile::tempdir().unwrap();
    let manager = AssetManager::new(AssetConfig::new(dir.path()), registry());
    assert!(manager.save_asset(&sample_clip(), "walk.json"));

    let mut clip = sample_clip();
    assert!(!manager.load_asset("walk.json", &mut clip));
}

#[test]
fn test_unknown_curve_type() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("bad.json"),
        r#"{"name": "x", "curve": {"$typeName": "Bezier", "$context": {}}}"#,
    )
    .unwrap();
    let manager = AssetManager::new(AssetConfig::new(dir.path()), registry());

    let mut clip = Clip::default();
    assert!(!manager.load_asset("bad.json", &mut clip));
    assert!(clip.curve.is_null());
}

#[test]
fn test_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("assets.ron");
    let root = dir.path().join("content");
    fs::write(
        &config_path,
        format!("(root_folder: {:?}, pretty: true)", root.to_string_lossy()),
    )
    .unwrap();

    let config = AssetConfig::from_file(&config_path).unwrap();
    let manager = AssetManager::new(config, registry());
    assert!(manager.save_asset(&sample_clip(), "walk.json"));

    let text = fs::read_to_string(root.join("walk.json")).unwrap();
    assert!(text.contains('\n'));
}
