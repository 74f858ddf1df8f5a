//! Toolbar DOM: buttons for every control plus the clear button.

use crate::host::HostError;
use marginalia_core::toolbar::{nearest_size_preset, palette_color};
use marginalia_core::{EngineConfig, ToolKind, ToolManager, ToolbarAction};
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, Event, HtmlElement};

const CONTROLS: [&str; 5] = ["inking", "tool", "ruler", "color", "size"];
const CLEAR_ATTRIBUTE: &str = "data-ink-clear";

/// The toolbar element and the buttons whose state mirrors the tools.
pub struct ToolbarView {
    root: HtmlElement,
    clear: HtmlElement,
    buttons: Vec<(ToolbarAction, HtmlElement)>,
}

impl ToolbarView {
    /// Build the toolbar and attach it to the body.
    pub fn build(document: &Document, config: &EngineConfig) -> Result<Self, HostError> {
        let body = document
            .body()
            .ok_or_else(|| HostError::MissingElement("body".to_string()))?;
        let root = html(document, "div")?;
        root.set_class_name("marginalia-toolbar");
        let style = root.style();
        style.set_property("position", "fixed")?;
        style.set_property("top", "8px")?;
        style.set_property("right", "8px")?;
        style.set_property("z-index", "1001")?;
        style.set_property("display", "flex")?;
        style.set_property("gap", "4px")?;

        let mut buttons = vec![(ToolbarAction::ToggleInk, button(document, "inking", "toggle", "ink")?)];
        for tool in [ToolKind::Pen, ToolKind::Highlighter, ToolKind::Eraser, ToolKind::Select] {
            let button = button(document, "tool", tool.name(), tool.name())?;
            buttons.push((ToolbarAction::Tool(tool), button));
        }
        buttons.push((ToolbarAction::ToggleRuler, button(document, "ruler", "toggle", "ruler")?));
        for (i, color) in config.palette.iter().enumerate() {
            let swatch = button(document, "color", &i.to_string(), "")?;
            swatch.style().set_property("background", &color.to_css())?;
            swatch.set_title(&color.to_css());
            buttons.push((ToolbarAction::Color(i), swatch));
        }
        for (i, size) in config.size_presets.iter().enumerate() {
            let label = format!("{size}x");
            buttons.push((ToolbarAction::Size(i), button(document, "size", &i.to_string(), &label)?));
        }
        for (_, button) in &buttons {
            root.append_child(button)?;
        }

        let clear = html(document, "button")?;
        clear.set_attribute(CLEAR_ATTRIBUTE, "")?;
        clear.set_text_content(Some("clear"));
        clear.set_title("Tap: clear this view. Hold: clear every view.");
        root.append_child(&clear)?;

        body.append_child(&root)?;
        Ok(Self { root, clear, buttons })
    }

    pub fn root(&self) -> &HtmlElement {
        &self.root
    }

    pub fn clear_button(&self) -> &HtmlElement {
        &self.clear
    }

    /// Mark the buttons matching the current tool state.
    pub fn sync(&self, tools: &ToolManager, config: &EngineConfig) {
        let size = nearest_size_preset(config, tools.size);
        for (action, button) in &self.buttons {
            let active = match *action {
                ToolbarAction::ToggleInk => tools.inking,
                ToolbarAction::Tool(tool) => tools.inking && tools.current_tool == tool,
                ToolbarAction::ToggleRuler => tools.ruler,
                ToolbarAction::Color(i) => palette_color(config, i) == Some(tools.color),
                ToolbarAction::Size(i) => size == i,
            };
            let _ = button.class_list().toggle_with_force("active", active);
            let _ = button.set_attribute("aria-pressed", if active { "true" } else { "false" });
        }
    }
}

/// The control a click landed on, if any.
pub fn action_for(event: &Event) -> Option<ToolbarAction> {
    let target = event.target()?.dyn_into::<Element>().ok()?;
    let button = target.closest("button").ok()??;
    CONTROLS.iter().find_map(|control| {
        let value = button.get_attribute(&format!("data-ink-{control}"))?;
        ToolbarAction::parse(control, &value)
    })
}

fn html(document: &Document, tag: &str) -> Result<HtmlElement, HostError> {
    document
        .create_element(tag)?
        .dyn_into::<HtmlElement>()
        .map_err(|_| HostError::Js(format!("<{tag}> is not an HTML element")))
}

fn button(document: &Document, control: &str, value: &str, label: &str) -> Result<HtmlElement, HostError> {
    let button = html(document, "button")?;
    button.set_attribute(&format!("data-ink-{control}"), value)?;
    button.set_attribute("type", "button")?;
    if !label.is_empty() {
        button.set_text_content(Some(label));
    }
    Ok(button)
}
