//! Properties panel - attributes of the first selected product
//!
//! Boolean and enumerated attributes are editable: clicking the value
//! flips the flag or steps to the next legal value.

use super::layout::RightPanel;
use super::styles::{small_text, UiColors, UiSizes};
use crate::loader::SceneLoadedEvent;
use crate::SceneState;
use bevy::ecs::hierarchy::ChildSpawnerCommands;
use bevy::prelude::*;
use bevy::ui::{
    widget::Button, BackgroundColor, BorderColor, BorderRadius, FlexDirection, Interaction,
    JustifyContent, Node, UiRect, Val,
};
use ifc_scene_graph::model::{AttributeValue, GlobalId};
use ifc_scene_graph::{ProductProperties, PropertyRow, SceneEvent, Subscription};

pub struct PropertiesPlugin;

impl Plugin for PropertiesPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_properties.after(super::layout::setup_layout))
            .add_systems(Update, (handle_edit_click, update_properties).chain());
    }
}

/// Name of the panel's subscription on the event bus
pub const PROPERTIES_VIEW: &str = "properties";

/// The panel's end of the event bus
#[derive(Resource)]
pub struct PropertiesSubscription {
    pub subscription: Subscription,
}

#[derive(Component)]
pub struct PropertiesContent;

/// Editable value of an attribute row
#[derive(Component, Clone, Debug)]
pub struct PropertyEdit {
    pub global_id: GlobalId,
    pub attribute: String,
    /// Text written when the value is clicked
    pub next: String,
}

/// Marker for spawned lines (cleanup marker)
#[derive(Component)]
pub struct PropertyLine;

/// One block of the panel
#[derive(Clone, Debug, PartialEq)]
pub enum PanelLine {
    Heading(String),
    Row(String, String),
    /// Attribute row whose value writes `next` when clicked
    Editable {
        label: String,
        value: String,
        next: String,
    },
}

/// Edit text a click on this row writes, if the row is editable
pub fn next_edit(row: &PropertyRow, choices: Option<&[String]>) -> Option<String> {
    match row.kind? {
        "BOOL" => Some(match row.attribute.value {
            AttributeValue::Bool(true) => ".F.".to_string(),
            _ => ".T.".to_string(),
        }),
        "ENUMERATION" => {
            let choices = choices.filter(|c| !c.is_empty())?;
            let next = match &row.attribute.value {
                AttributeValue::Enum(current) => choices
                    .iter()
                    .position(|c| c == current)
                    .map_or(0, |i| (i + 1) % choices.len()),
                _ => 0,
            };
            Some(choices[next].clone())
        }
        _ => None,
    }
}

/// Lay out the properties of a product
///
/// `choices` yields the legal values of an enumerated attribute by name.
pub fn property_lines(
    props: &ProductProperties,
    choices: impl Fn(&str) -> Option<Vec<String>>,
) -> Vec<PanelLine> {
    let product = &props.product;
    let mut lines = vec![
        PanelLine::Row("GlobalId".into(), product.global_id.to_string()),
        PanelLine::Row("Class".into(), product.class.clone()),
    ];
    if let Some(name) = &product.name {
        lines.push(PanelLine::Row("Name".into(), name.clone()));
    }
    lines.push(PanelLine::Row("Entity".into(), product.id.to_string()));
    lines.push(PanelLine::Row("Schema".into(), props.schema.clone()));

    lines.push(PanelLine::Heading("Attributes".into()));
    for row in &props.rows {
        let value = match row.kind {
            Some(kind) => format!("{} : {}", row.attribute.value, kind),
            None => row.attribute.value.to_string(),
        };
        let options = choices(&row.attribute.name);
        match next_edit(row, options.as_deref()) {
            Some(next) => lines.push(PanelLine::Editable {
                label: row.attribute.name.clone(),
                value,
                next,
            }),
            None => lines.push(PanelLine::Row(row.attribute.name.clone(), value)),
        }
    }

    if !props.related.is_empty() {
        lines.push(PanelLine::Heading("Related".into()));
        for (gid, depth) in &props.related {
            lines.push(PanelLine::Row(gid.to_string(), format!("depth {}", depth)));
        }
    }
    lines
}

fn setup_properties(
    mut commands: Commands,
    panel_query: Query<Entity, With<RightPanel>>,
    scene: Res<SceneState>,
) {
    commands.insert_resource(PropertiesSubscription {
        subscription: scene.view.bus().subscribe(PROPERTIES_VIEW),
    });

    let Ok(panel_entity) = panel_query.single() else {
        return;
    };

    commands.entity(panel_entity).with_children(|panel| {
        panel.spawn((
            Text::new("Properties"),
            TextFont {
                font_size: UiSizes::FONT_SIZE_LG,
                ..default()
            },
            TextColor(UiColors::TEXT_PRIMARY),
            Node {
                margin: UiRect::bottom(Val::Px(UiSizes::PADDING)),
                ..default()
            },
        ));

        panel.spawn((
            PropertiesContent,
            Node {
                width: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                ..default()
            },
            BackgroundColor(Color::NONE),
        ));
    });
}

fn handle_edit_click(
    query: Query<(&Interaction, &PropertyEdit), Changed<Interaction>>,
    mut scene: ResMut<SceneState>,
) {
    for (interaction, edit) in query.iter() {
        if *interaction != Interaction::Pressed {
            continue;
        }
        match scene
            .view
            .edit_attribute(&edit.global_id, &edit.attribute, &edit.next)
        {
            Ok(value) => {
                crate::log_info(&format!(
                    "[UI] {}.{} = {}",
                    edit.global_id, edit.attribute, value
                ));
                scene.status = format!("{} set to {}", edit.attribute, value);
            }
            Err(e) => {
                log::warn!("[UI] Edit of {} rejected: {}", edit.attribute, e);
                scene.status = format!("Edit rejected: {}", e);
            }
        }
    }
}

fn update_properties(
    mut commands: Commands,
    scene: Res<SceneState>,
    subscription: Option<Res<PropertiesSubscription>>,
    mut loaded: MessageReader<SceneLoadedEvent>,
    content_query: Query<Entity, With<PropertiesContent>>,
    existing_lines: Query<Entity, With<PropertyLine>>,
    mut shown: Local<Option<Option<GlobalId>>>,
) {
    let reloaded = loaded.read().count() > 0;
    let updated = subscription.is_some_and(|s| {
        s.subscription
            .drain()
            .iter()
            .any(|e| matches!(e, SceneEvent::Update(_)))
    });
    let selected = scene.view.selection().selected().first().cloned();
    if !reloaded && !updated && shown.as_ref() == Some(&selected) {
        return;
    }

    let Ok(content_entity) = content_query.single() else {
        return;
    };
    *shown = Some(selected.clone());

    for entity in existing_lines.iter() {
        commands.entity(entity).despawn();
    }

    let props = selected
        .as_ref()
        .and_then(|gid| scene.view.properties(gid).map(|p| (gid, p)));
    commands.entity(content_entity).with_children(|content| match props {
        Some((gid, props)) => {
            let lines = property_lines(&props, |name| scene.view.attribute_choices(gid, name));
            for line in lines {
                match line {
                    PanelLine::Heading(title) => spawn_heading(content, &title),
                    PanelLine::Row(label, value) => {
                        spawn_property_row(content, &label, &value, None)
                    }
                    PanelLine::Editable { label, value, next } => {
                        let edit = PropertyEdit {
                            global_id: gid.clone(),
                            attribute: label.clone(),
                            next,
                        };
                        spawn_property_row(content, &label, &value, Some(edit))
                    }
                }
            }
        }
        None => spawn_no_selection(content),
    });
}

fn spawn_heading(parent: &mut ChildSpawnerCommands, title: &str) {
    parent.spawn((
        PropertyLine,
        Text::new(title),
        TextFont {
            font_size: UiSizes::FONT_SIZE,
            ..default()
        },
        TextColor(UiColors::TEXT_ACCENT),
        Node {
            margin: UiRect::vertical(Val::Px(UiSizes::PADDING)),
            ..default()
        },
    ));
}

fn spawn_property_row(
    parent: &mut ChildSpawnerCommands,
    label: &str,
    value: &str,
    edit: Option<PropertyEdit>,
) {
    parent
        .spawn((
            PropertyLine,
            Node {
                width: Val::Percent(100.0),
                flex_direction: FlexDirection::Row,
                justify_content: JustifyContent::SpaceBetween,
                padding: UiRect::vertical(Val::Px(UiSizes::PADDING_SM)),
                border: UiRect::bottom(Val::Px(1.0)),
                ..default()
            },
            BorderColor::all(UiColors::BORDER),
        ))
        .with_children(|row: &mut ChildSpawnerCommands| {
            row.spawn(small_text(label, UiColors::TEXT_SECONDARY));
            match edit {
                Some(edit) => {
                    row.spawn((
                        edit,
                        Button,
                        Node {
                            padding: UiRect::horizontal(Val::Px(UiSizes::PADDING_SM)),
                            border_radius: BorderRadius::all(Val::Px(UiSizes::BORDER_RADIUS)),
                            ..default()
                        },
                        BackgroundColor(UiColors::BUTTON_BG),
                    ))
                    .with_children(|button: &mut ChildSpawnerCommands| {
                        button.spawn(small_text(value, UiColors::TEXT_ACCENT));
                    });
                }
                None => {
                    row.spawn(small_text(value, UiColors::TEXT_PRIMARY));
                }
            }
        });
}

fn spawn_no_selection(parent: &mut ChildSpawnerCommands) {
    parent.spawn((
        PropertyLine,
        Text::new("No selection"),
        TextFont {
            font_size: UiSizes::FONT_SIZE,
            ..default()
        },
        TextColor(UiColors::TEXT_SECONDARY),
        Node {
            margin: UiRect::top(Val::Px(UiSizes::PADDING * 2.0)),
            ..default()
        },
    ));

    parent.spawn((
        PropertyLine,
        small_text(
            "Click a product in the 3D view or the scene tree to see its attributes.",
            UiColors::TEXT_SECONDARY,
        ),
        Node {
            margin: UiRect::top(Val::Px(UiSizes::PADDING)),
            ..default()
        },
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifc_scene_graph::model::{Attribute, EntityId, ProductInfo};

    fn row(name: &str, value: AttributeValue, kind: Option<&'static str>) -> PropertyRow {
        PropertyRow {
            attribute: Attribute {
                name: name.into(),
                value,
            },
            kind,
        }
    }

    fn wall_types() -> Vec<String> {
        vec!["SOLIDWALL".into(), "SHEAR".into(), "NOTDEFINED".into()]
    }

    #[test]
    fn test_property_lines() {
        let props = ProductProperties {
            product: ProductInfo {
                id: EntityId(7),
                global_id: GlobalId::from("G1"),
                class: "IfcWall".into(),
                name: Some("Basic Wall".into()),
            },
            schema: "IFC4".into(),
            rows: vec![
                row(
                    "PredefinedType",
                    AttributeValue::Enum("SOLIDWALL".into()),
                    Some("ENUMERATION"),
                ),
                row("Tag", AttributeValue::Null, None),
                row("ObjectType", AttributeValue::Null, Some("STRING")),
            ],
            related: vec![(GlobalId::from("G2"), 1)],
        };

        let lines = property_lines(&props, |name| {
            (name == "PredefinedType").then(wall_types)
        });
        assert_eq!(lines[0], PanelLine::Row("GlobalId".into(), "G1".into()));
        assert_eq!(lines[2], PanelLine::Row("Name".into(), "Basic Wall".into()));
        assert_eq!(lines[3], PanelLine::Row("Entity".into(), "#7".into()));
        assert!(lines.contains(&PanelLine::Editable {
            label: "PredefinedType".into(),
            value: ".SOLIDWALL. : ENUMERATION".into(),
            next: "SHEAR".into(),
        }));
        assert!(lines.contains(&PanelLine::Row("Tag".into(), "$".into())));
        assert!(lines.contains(&PanelLine::Row("ObjectType".into(), "$ : STRING".into())));
        assert_eq!(lines.last(), Some(&PanelLine::Row("G2".into(), "depth 1".into())));
    }

    #[test]
    fn test_next_edit_flips_bool() {
        let on = row("IsExternal", AttributeValue::Bool(true), Some("BOOL"));
        let unset = row("IsExternal", AttributeValue::Null, Some("BOOL"));
        assert_eq!(next_edit(&on, None), Some(".F.".into()));
        assert_eq!(next_edit(&unset, None), Some(".T.".into()));
    }

    #[test]
    fn test_next_edit_cycles_enum() {
        let types = wall_types();
        let last = row(
            "PredefinedType",
            AttributeValue::Enum("NOTDEFINED".into()),
            Some("ENUMERATION"),
        );
        let unset = row("PredefinedType", AttributeValue::Null, Some("ENUMERATION"));
        assert_eq!(next_edit(&last, Some(types.as_slice())), Some("SOLIDWALL".into()));
        assert_eq!(next_edit(&unset, Some(types.as_slice())), Some("SOLIDWALL".into()));
        assert_eq!(next_edit(&unset, None), None);
        assert_eq!(next_edit(&unset, Some(&types[..0])), None);
    }

    #[test]
    fn test_text_rows_are_read_only() {
        let name = row("Name", AttributeValue::String("W".into()), Some("STRING"));
        assert_eq!(next_edit(&name, None), None);
        let unknown = row("Custom", AttributeValue::Bool(true), None);
        assert_eq!(next_edit(&unknown, None), None);
    }
}
