use crate::mirror::{ViewFlags, ViewId};
use crate::session::ExplorerSession;
use crate::source::{PropertyPanel, SceneSource};
use egui::{Color32, RichText, Ui};
use std::collections::HashSet;

const INDENT: f32 = 14.0;

#[derive(Debug, Default)]
pub struct ExplorerUiState {
    collapsed: HashSet<ViewId>,
    pub filter: String,
}

/// What one frame of the explorer produced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExplorerResponse {
    pub rows_drawn: usize,
    /// The Delete button was clicked, or the Delete key pressed outside a text field.
    pub delete_requested: bool,
}

/// Click outcome collected while drawing, applied after the frame's rows are laid out.
enum RowClick {
    Replace(ViewId),
    Toggle(ViewId),
}

/// Draws the explorer rows. When `delete_requested` is set the caller, which owns the
/// engine mutably, runs `ExplorerSession::delete_selection`.
pub fn show_explorer(
    ui: &mut Ui,
    state: &mut ExplorerUiState,
    session: &mut ExplorerSession,
    source: &dyn SceneSource,
    panel: &mut dyn PropertyPanel,
) -> ExplorerResponse {
    ui.heading(session.title().to_string());
    ui.horizontal(|ui| {
        ui.label("Filter");
        ui.text_edit_singleline(&mut state.filter);
    });
    ui.separator();

    let mut click = None;
    let mut rows_drawn = 0;
    egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
        let view = session.mirror().view();
        let filter = state.filter.trim().to_ascii_lowercase();
        let mut stack: Vec<(ViewId, usize)> = view.roots().iter().rev().map(|root| (*root, 0)).collect();
        while let Some((id, depth)) = stack.pop() {
            let Some(node) = view.get(id) else {
                continue;
            };
            let has_children = !node.children().is_empty();
            let collapsed = state.collapsed.contains(&id);
            let visible = filter.is_empty() || node.label().to_ascii_lowercase().contains(&filter);
            if visible {
                rows_drawn += 1;
                ui.horizontal(|ui| {
                    ui.add_space(depth as f32 * INDENT);
                    if has_children {
                        let arrow = if collapsed { "+" } else { "-" };
                        if ui.small_button(arrow).clicked() {
                            if collapsed {
                                state.collapsed.remove(&id);
                            } else {
                                state.collapsed.insert(id);
                            }
                        }
                    } else {
                        ui.add_space(INDENT);
                    }
                    let mut text = RichText::new(node.label());
                    if !node.flags().contains(ViewFlags::DRAGGABLE) {
                        text = text.color(Color32::LIGHT_GRAY);
                    }
                    let response = ui.selectable_label(node.is_selected(), text).on_hover_text(node.class_name());
                    if response.clicked() && node.flags().contains(ViewFlags::SELECTABLE) {
                        let toggle = ui.input(|input| input.modifiers.command);
                        click = Some(if toggle { RowClick::Toggle(id) } else { RowClick::Replace(id) });
                    }
                });
            }
            if !collapsed || !filter.is_empty() {
                stack.extend(node.children().iter().rev().map(|child| (*child, depth + 1)));
            }
        }
    });

    match click {
        Some(RowClick::Replace(id)) => {
            session.select(source, id, false, panel);
        }
        Some(RowClick::Toggle(id)) => {
            session.mirror_mut().view_mut().toggle_selection(id);
            session.sync_selection(source, panel);
        }
        None => {}
    }
    state.collapsed.retain(|id| session.mirror().view().contains(*id));

    ui.separator();
    let selected = session.selection().nodes().len();
    let delete_enabled = session.selection().delete_enabled();
    let clicked = ui
        .horizontal(|ui| {
            ui.label(format!("{selected} selected"));
            ui.add_enabled(delete_enabled, egui::Button::new("Delete")).clicked()
        })
        .inner;
    let key = !ui.ctx().wants_keyboard_input() && ui.input(|input| input.key_pressed(egui::Key::Delete));
    ExplorerResponse { rows_drawn, delete_requested: delete_enabled && (clicked || key) }
}
