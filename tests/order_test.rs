use image::Rgba;
use tee_studio::{
    Font, Placement, Side, StudioError, TextRequest,
    order::{
        CatalogOrder, CheckoutOrder, ContactDetails, Navigator, Order, OrderBackend, OutboxBackend,
        Receipt, Route, place_order, submit_design,
    },
    scene::HandOff,
};

use crate::common::test_utils::{loaded_scene, png_upload, scratch_dir};

mod common;

#[derive(Default)]
struct Recorder(Vec<Route>);

impl Navigator for Recorder {
    fn navigate(&mut self, route: Route) {
        self.0.push(route);
    }
}

struct Rejecting;

impl OrderBackend for Rejecting {
    fn persist(&mut self, _order: &Order) -> tee_studio::Result<Receipt> {
        Err(StudioError::Order("503 from the order api".to_string()))
    }
}

fn finished_design() -> HandOff {
    let mut scene = loaded_scene(&["Front", "Back"]);
    scene
        .apply_text(&TextRequest::new("HELLO", Side::Front, Font::Georgia, Placement::Stomach))
        .unwrap();
    scene
        .apply_image(Side::Back, Some(png_upload("logo.png", Rgba([0, 0, 255, 255]))))
        .unwrap();
    scene.hand_off().unwrap()
}

#[test]
fn checkout_needs_name_and_address() {
    let hand_off = finished_design();
    assert!(matches!(
        CheckoutOrder::new("", "1 Main St", &hand_off),
        Err(StudioError::IncompleteContact("name"))
    ));
    assert!(matches!(
        CheckoutOrder::new("Ada", " ", &hand_off),
        Err(StudioError::IncompleteContact("address"))
    ));

    let order = CheckoutOrder::new("Ada", "1 Main St", &hand_off).unwrap();
    assert_eq!(order.front_screenshot, hand_off.views.front.data_uri());
    assert_eq!(order.back_screenshot, hand_off.views.back.data_uri());
}

#[test]
fn catalog_order_totals_the_quantity() {
    let hand_off = finished_design();
    let customer = ContactDetails {
        name: "Ada".into(),
        email: "ada@example.com".into(),
        address: "1 Main St".into(),
    };
    let order = CatalogOrder::new(customer, &hand_off, 3, 1999).unwrap();
    assert_eq!(order.total_cents, 5997);
    assert_eq!(order.design, hand_off.design);

    let zero = CatalogOrder::new(order.customer.clone(), &hand_off, 0, 1999).unwrap();
    assert_eq!(zero.quantity, 1);
}

#[test]
fn navigation_only_follows_a_stored_order() {
    let hand_off = finished_design();
    let order = Order::Checkout(CheckoutOrder::new("Ada", "1 Main St", &hand_off).unwrap());

    let mut navigator = Recorder::default();
    let err = place_order(&mut Rejecting, &mut navigator, &order).unwrap_err();
    assert!(err.is_user_facing());
    assert!(navigator.0.is_empty());

    let dir = scratch_dir("navigation");
    let receipt = place_order(&mut OutboxBackend::new(&dir), &mut navigator, &order).unwrap();
    assert_eq!(receipt.order_id, "order-0001");
    assert_eq!(navigator.0, vec![Route::OrderPlaced]);
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn submitting_a_design_opens_the_contact_form() {
    let mut scene = loaded_scene(&["Front", "Back"]);
    scene
        .apply_text(&TextRequest::new("HELLO", Side::Front, Font::Arial, Placement::Chest))
        .unwrap();

    let mut navigator = Recorder::default();
    let hand_off = submit_design(&mut scene, &mut navigator).unwrap();
    assert_eq!(hand_off.design.front.text, "HELLO");
    assert_eq!(navigator.0, vec![Route::SubmitDesign]);
}

#[test]
fn failed_capture_stays_on_the_view() {
    let mut scene = loaded_scene(&["Front", "Back"]);
    scene.renderer_mut().fail_capture = true;

    let mut navigator = Recorder::default();
    let err = submit_design(&mut scene, &mut navigator).unwrap_err();
    assert!(matches!(err, StudioError::Capture(_)));
    assert!(navigator.0.is_empty());
}

#[test]
fn outbox_writes_camel_case_json_without_overwriting() {
    let hand_off = finished_design();
    let dir = scratch_dir("outbox");
    let order = Order::Checkout(CheckoutOrder::new("Ada", "1 Main St", &hand_off).unwrap());

    let first = OutboxBackend::new(&dir).persist(&order).unwrap();
    // A second outbox over the same directory skips ids already on disk.
    let second = OutboxBackend::new(&dir).persist(&order).unwrap();
    assert_eq!(first.order_id, "order-0001");
    assert_eq!(second.order_id, "order-0002");

    let text = std::fs::read_to_string(dir.join("order-0001.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["name"], "Ada");
    assert!(
        json["frontScreenshot"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,")
    );
    assert!(json["backScreenshot"].is_string());
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn catalog_json_carries_the_per_side_design() {
    let hand_off = finished_design();
    let customer = ContactDetails {
        name: "Ada".into(),
        email: "ada@example.com".into(),
        address: "1 Main St".into(),
    };
    let order = Order::Catalog(CatalogOrder::new(customer, &hand_off, 2, 1500).unwrap());
    let json = serde_json::to_value(&order).unwrap();
    assert_eq!(json["design"]["front"]["text"], "HELLO");
    assert_eq!(json["design"]["front"]["font"], "Georgia");
    assert_eq!(json["design"]["front"]["position"], 1.5);
    assert!(json["design"]["back"]["imageSource"].is_string());
    assert_eq!(json["totalCents"], 3000);
    assert_eq!(json["customer"]["email"], "ada@example.com");
}

#[test]
fn captured_views_are_saved_under_their_names() {
    let hand_off = finished_design();
    let dir = scratch_dir("captures");
    let [front, back] = hand_off.views.save_in(&dir).unwrap();
    assert_eq!(front.file_name().unwrap(), "front_view.png");
    assert_eq!(back.file_name().unwrap(), "back_view.png");
    assert_eq!(std::fs::read(&front).unwrap(), hand_off.views.front.png);
    let _ = std::fs::remove_dir_all(dir);
}
