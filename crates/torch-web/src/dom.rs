use wasm_bindgen::JsCast;
use web_sys as web;

#[inline]
pub fn window_document() -> Option<web::Document> {
    web::window().and_then(|w| w.document())
}

pub fn on_event(target: &web::EventTarget, event: &str, mut handler: impl FnMut() + 'static) {
    let closure =
        wasm_bindgen::closure::Closure::wrap(Box::new(move || handler()) as Box<dyn FnMut()>);
    let _ = target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref());
    closure.forget();
}

/// Canvas backing size in device pixels for its current CSS size.
pub fn canvas_backing_size(canvas: &web::HtmlCanvasElement) -> (u32, u32) {
    let dpr = web::window().map(|w| w.device_pixel_ratio()).unwrap_or(1.0);
    let rect = canvas.get_bounding_client_rect();
    let w_px = (rect.width() * dpr) as u32;
    let h_px = (rect.height() * dpr) as u32;
    (w_px.max(1), h_px.max(1))
}

pub fn set_canvas_size(canvas: &web::HtmlCanvasElement, (width, height): (u32, u32)) {
    canvas.set_width(width);
    canvas.set_height(height);
}

/// `#torch-canvas`, created full-window if the page does not provide one.
pub fn find_or_create_canvas(document: &web::Document) -> anyhow::Result<web::HtmlCanvasElement> {
    let el = match document.get_element_by_id("torch-canvas") {
        Some(el) => el,
        None => {
            let el = document
                .create_element("canvas")
                .map_err(|e| anyhow::anyhow!(format!("{:?}", e)))?;
            el.set_id("torch-canvas");
            el.set_attribute("style", "position:fixed;inset:0;width:100%;height:100%")
                .map_err(|e| anyhow::anyhow!(format!("{:?}", e)))?;
            let body = document
                .body()
                .ok_or_else(|| anyhow::anyhow!("no body"))?;
            body.append_child(&el)
                .map_err(|e| anyhow::anyhow!(format!("{:?}", e)))?;
            el
        }
    };
    el.dyn_into::<web::HtmlCanvasElement>()
        .map_err(|e| anyhow::anyhow!(format!("{:?}", e)))
}

/// Small fixed-position button appended to the body.
pub fn add_button(
    document: &web::Document,
    label: &str,
    handler: impl FnMut() + 'static,
) -> anyhow::Result<()> {
    let button = document
        .create_element("button")
        .map_err(|e| anyhow::anyhow!(format!("{:?}", e)))?;
    button.set_text_content(Some(label));
    button
        .set_attribute("style", "position:fixed;right:1em;bottom:1em;z-index:1")
        .map_err(|e| anyhow::anyhow!(format!("{:?}", e)))?;
    let body = document
        .body()
        .ok_or_else(|| anyhow::anyhow!("no body"))?;
    body.append_child(&button)
        .map_err(|e| anyhow::anyhow!(format!("{:?}", e)))?;
    on_event(&button, "click", handler);
    Ok(())
}
