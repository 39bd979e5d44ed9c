use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use serde_json::{json, Value as Json};
use tosca_parser::{parse_str, ParserError, Topology};

fn build(yaml: &str) -> Result<Topology, ParserError> {
    parse_str(yaml, "service.yaml", &IndexMap::new())
}

fn build_with(yaml: &str, inputs: Json) -> Result<Topology, ParserError> {
    let inputs: IndexMap<String, Json> = serde_json::from_value(inputs).unwrap();
    parse_str(yaml, "service.yaml", &inputs)
}

// Helper to assert on the message of a located error
fn parse_message(err: &ParserError) -> String {
    match err {
        ParserError::Parse(err) => err.message.clone(),
        other => panic!("expected a located parse error, got {:?}", other),
    }
}

#[test]
fn test_minimal_document_builds_one_node() {
    let topology = build(
        r#"
tosca_definitions_version: tosca_simple_yaml_1_3
node_types:
  my.nodes.Server:
    properties:
      port: {type: integer, default: 80}
topology_template:
  node_templates:
    server:
      type: my.nodes.Server
"#,
    )
    .unwrap();

    assert_eq!(topology.nodes.len(), 1);
    let server = topology.node("server").unwrap();
    assert_eq!(server.types, vec!["my.nodes.Server"]);
    assert!(server.capabilities.is_empty());
    assert_eq!(server.properties.get("port"), Some(&json!(80)));
}

#[test]
fn test_unsupported_version_is_rejected() {
    let err = build("tosca_definitions_version: tosca_simple_yaml_1_0\n").unwrap_err();
    assert_eq!(err.error_code(), "ERR_TOSCA_UNSUPPORTED_VERSION");
    assert_eq!(err.location().map(|loc| loc.line), Some(1));
}

#[test]
fn test_duplicate_keys_fail_before_schema_processing() {
    let err = build(
        r#"
tosca_definitions_version: tosca_simple_yaml_1_3
not_a_section: 1
not_a_section: 2
"#,
    )
    .unwrap_err();
    assert_eq!(parse_message(&err), "Duplicate map key: 'not_a_section'.");
    assert_eq!(err.location().map(|loc| loc.line), Some(4));
}

#[test]
fn test_errors_carry_document_locations() {
    let err = build(
        r#"
tosca_definitions_version: tosca_simple_yaml_1_3
topology_template:
  node_templates:
    server:
      type: my.nodes.Missing
"#,
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "service.yaml:6:13: Invalid reference: 'my.nodes.Missing' is not defined in node_types."
    );
}

const INHERITANCE: &str = r#"
tosca_definitions_version: tosca_simple_yaml_1_3
capability_types:
  my.capabilities.Endpoint:
    properties:
      protocol: {type: string, default: tcp}
node_types:
  my.nodes.Base:
    properties:
      a: {type: integer, default: 1}
      b: {type: integer, default: 2}
      unset: {type: string}
    capabilities:
      endpoint: my.capabilities.Endpoint
  my.nodes.Web:
    derived_from: my.nodes.Base
    properties:
      b: {type: integer, default: 20}
      url:
        type: string
        default: {concat: ["http://", {get_property: [SELF, host]}, ":", {get_property: [SELF, a]}]}
      host: {type: string, default: localhost}
topology_template:
  node_templates:
    web:
      type: my.nodes.Web
      properties:
        a: 8080
      capabilities:
        endpoint:
          properties:
            protocol: http
"#;

#[test]
fn test_explicit_assignments_replace_inherited_entries() {
    let topology = build(INHERITANCE).unwrap();
    let web = topology.node("web").unwrap();

    assert_eq!(web.types, vec!["my.nodes.Web", "my.nodes.Base"]);
    let names: Vec<_> = web.properties.keys().cloned().collect();
    assert_eq!(names, vec!["b", "url", "host", "a"]);
    assert_eq!(web.properties["a"], json!(8080));
    assert_eq!(web.properties["b"], json!(20));
    assert!(!web.properties.contains_key("unset"));
}

#[test]
fn test_functions_see_final_property_values() {
    let topology = build(INHERITANCE).unwrap();
    let web = topology.node("web").unwrap();
    assert_eq!(web.properties["url"], json!("http://localhost:8080"));
}

#[test]
fn test_capability_short_form_and_assignment() {
    let topology = build(INHERITANCE).unwrap();
    let endpoint = &topology.node("web").unwrap().capabilities["endpoint"];
    assert_eq!(endpoint.types, vec!["my.capabilities.Endpoint"]);
    assert_eq!(endpoint.properties["protocol"], json!("http"));
}

#[test]
fn test_undeclared_property_is_rejected() {
    let yaml = INHERITANCE.replace("        a: 8080", "        colour: red");
    let err = build(&yaml).unwrap_err();
    let message = parse_message(&err);
    assert!(message.starts_with("Undeclared property: 'colour'"), "{}", message);
}

const POLICY_TARGETS: &str = r#"
tosca_definitions_version: tosca_simple_yaml_1_3
node_types:
  NodeTypeA: {}
  NodeTypeB: {}
  NodeTypeC:
    derived_from: NodeTypeA
policy_types:
  my.policies.Scaling:
    targets: [NodeTypeA]
topology_template:
  node_templates:
    a1: {type: NodeTypeA}
    b1: {type: NodeTypeB}
    a2: {type: NodeTypeA}
    c1: {type: NodeTypeC}
  policies:
    - scale: {type: my.policies.Scaling}
"#;

#[test]
fn test_type_level_targets_match_first_type_only() {
    let topology = build(POLICY_TARGETS).unwrap();
    let policy = topology.policy("scale").unwrap();
    assert_eq!(policy.targets, vec!["a1", "a2"]);
}

#[test]
fn test_template_targets_replace_type_targets() {
    let yaml = POLICY_TARGETS.replace(
        "    - scale: {type: my.policies.Scaling}",
        "    - scale: {type: my.policies.Scaling, targets: [b1, c1]}",
    );
    let topology = build(&yaml).unwrap();
    assert_eq!(topology.policy("scale").unwrap().targets, vec!["b1", "c1"]);
}

#[test]
fn test_unknown_target_fails() {
    let yaml = POLICY_TARGETS.replace(
        "    - scale: {type: my.policies.Scaling}",
        "    - scale: {type: my.policies.Scaling, targets: [ghost]}",
    );
    let message = parse_message(&build(&yaml).unwrap_err());
    assert!(message.contains("'ghost' is not defined in any of"), "{}", message);
}

const TRIGGERS: &str = r#"
tosca_definitions_version: tosca_simple_yaml_1_3
interface_types:
  tosca.interfaces.node.lifecycle.Standard:
    operations:
      create: {description: Creation}
      delete: {}
node_types:
  my.nodes.App:
    interfaces:
      Standard:
        type: tosca.interfaces.node.lifecycle.Standard
        operations:
          create: playbooks/create.yaml
  my.nodes.Db: {}
policy_types:
  my.policies.Scale:
    properties:
      step: {type: integer, default: 2}
    triggers:
      on_load:
        event: inherited_event
        action:
          - call_operation: Standard.delete
topology_template:
  node_templates:
    app:
      type: my.nodes.App
    db:
      type: my.nodes.Db
  policies:
    - scale_up:
        type: my.policies.Scale
        targets: [app]
        triggers:
          on_load:
            event: high_load
            target_filter:
              node: app
            action:
              - call_operation:
                  operation: Standard.create
                  inputs:
                    amount: {get_property: [SELF, step]}
"#;

#[test]
fn test_call_operation_resolves_to_node_interface() {
    let topology = build(TRIGGERS).unwrap();
    let trigger = &topology.policy("scale_up").unwrap().triggers["on_load"];

    assert_eq!(trigger.event.as_deref(), Some("high_load"));
    assert_eq!(trigger.target_filter.as_deref(), Some("app"));
    assert_eq!(trigger.actions.len(), 1);

    let action = &trigger.actions[0];
    assert_eq!(action.node, "app");
    assert_eq!(action.interface, "Standard");
    assert_eq!(action.operation, "create");
    assert_eq!(action.inputs.get("amount"), Some(&json!(2)));
}

#[test]
fn test_operations_merge_interface_type_and_definition() {
    let topology = build(TRIGGERS).unwrap();
    let standard = &topology.node("app").unwrap().interfaces["Standard"];
    let names: Vec<_> = standard.operations.keys().cloned().collect();
    assert_eq!(names, vec!["delete", "create"]);
    assert_eq!(standard.operations["create"].primary.as_deref(), Some("playbooks/create.yaml"));
    assert_eq!(standard.operations["delete"].primary, None);
}

#[test]
fn test_unknown_operation_names_the_call() {
    let yaml = TRIGGERS.replace("operation: Standard.create", "operation: Standard.configure");
    let message = parse_message(&build(&yaml).unwrap_err());
    assert!(message.contains("Standard.configure"), "{}", message);
    assert!(message.contains("<interface_sub_name>.<operation_sub_name>"));
}

#[test]
fn test_target_filter_outside_policy_targets_fails() {
    let yaml = TRIGGERS.replace("              node: app", "              node: db");
    let message = parse_message(&build(&yaml).unwrap_err());
    assert!(message.contains("The node reference: db"), "{}", message);
}

#[test]
fn test_target_filter_without_node_fails() {
    let yaml = TRIGGERS.replace("              node: app", "              capability: scalable");
    let message = parse_message(&build(&yaml).unwrap_err());
    assert_eq!(message, "Cannot obtain node from target_filter.");
}

#[test]
fn test_unsupported_activity_is_rejected() {
    let yaml = TRIGGERS.replace("              - call_operation:\n                  operation: Standard.create\n                  inputs:\n                    amount: {get_property: [SELF, step]}\n", "              - delegate: scale_workflow\n");
    let message = parse_message(&build(&yaml).unwrap_err());
    assert_eq!(
        message,
        "Unsupported trigger activity definitions: delegate. Only call_operation is supported."
    );
}

#[test]
fn test_inherited_trigger_is_used_when_template_has_none() {
    let yaml = TRIGGERS.replace("        targets: [app]\n", "").replace(
        "        triggers:\n          on_load:\n            event: high_load\n            target_filter:\n              node: app\n            action:\n              - call_operation:\n                  operation: Standard.create\n                  inputs:\n                    amount: {get_property: [SELF, step]}\n",
        "",
    );
    let topology = build(&yaml).unwrap();
    let trigger = &topology.policy("scale_up").unwrap().triggers["on_load"];
    assert_eq!(trigger.event.as_deref(), Some("inherited_event"));
    assert_eq!(trigger.actions[0].operation, "delete");
    assert_eq!(trigger.actions[0].node, "app");
}

const CANDIDATES: &str = r#"
tosca_definitions_version: tosca_simple_yaml_1_3
interface_types:
  tosca.interfaces.node.lifecycle.Standard:
    operations:
      create: {}
node_types:
  my.nodes.App:
    interfaces:
      Standard:
        type: tosca.interfaces.node.lifecycle.Standard
  my.nodes.Edge:
    derived_from: my.nodes.App
policy_types:
  my.policies.Scale: {}
topology_template:
  node_templates:
    a: {type: my.nodes.App}
    b: {type: my.nodes.App}
    c: {type: my.nodes.Edge}
  policies:
    - scale:
        type: my.policies.Scale
        triggers:
          on_load:
            event: high_load
            target_filter:
              node: c
            action:
              - call_operation: Standard.create
"#;

#[test]
fn test_target_filter_narrows_candidates_to_one_node() {
    let topology = build(CANDIDATES).unwrap();
    let trigger = &topology.policy("scale").unwrap().triggers["on_load"];
    assert_eq!(trigger.target_filter.as_deref(), Some("c"));
    assert_eq!(trigger.actions[0].node, "c");
}

#[test]
fn test_target_filter_by_node_type() {
    let yaml = CANDIDATES.replace("              node: c", "              node: my.nodes.Edge");
    let topology = build(&yaml).unwrap();
    let trigger = &topology.policy("scale").unwrap().triggers["on_load"];
    assert_eq!(trigger.target_filter.as_deref(), Some("c"));
    assert_eq!(trigger.actions[0].node, "c");
}

#[test]
fn test_first_matching_node_wins_without_filter() {
    let yaml = CANDIDATES.replace("            target_filter:\n              node: c\n", "");
    let topology = build(&yaml).unwrap();
    let trigger = &topology.policy("scale").unwrap().triggers["on_load"];
    assert_eq!(trigger.target_filter, None);
    assert_eq!(trigger.actions.len(), 1);
    assert_eq!(trigger.actions[0].node, "a");
    assert_eq!(trigger.actions[0].operation, "create");
}

const INPUTS: &str = r#"
tosca_definitions_version: tosca_simple_yaml_1_3
node_types:
  my.nodes.Vm:
    properties:
      flavor: {type: string}
      region: {type: string}
topology_template:
  inputs:
    flavor:
      type: string
    region:
      type: string
      default: eu-west
  node_templates:
    vm:
      type: my.nodes.Vm
      properties:
        flavor: {get_input: flavor}
        region: {get_input: region}
  outputs:
    summary:
      value: {concat: [{get_input: flavor}, "@", {get_input: region}]}
"#;

#[test]
fn test_inputs_defaults_and_outputs() {
    let topology = build_with(INPUTS, json!({"flavor": "m1.small", "unused": 1})).unwrap();
    let vm = topology.node("vm").unwrap();
    assert_eq!(vm.properties["flavor"], json!("m1.small"));
    assert_eq!(vm.properties["region"], json!("eu-west"));
    assert!(!topology.inputs.contains_key("unused"));
    assert_eq!(topology.outputs["summary"], json!("m1.small@eu-west"));
}

#[test]
fn test_missing_required_input_fails() {
    let message = parse_message(&build(INPUTS).unwrap_err());
    assert_eq!(message, "Missing required input: 'flavor'.");
}

#[test]
fn test_requirements_resolve_templates_and_types() {
    let topology = build(
        r#"
tosca_definitions_version: tosca_simple_yaml_1_3
capability_types:
  my.capabilities.Host: {}
relationship_types:
  my.relationships.HostedOn: {}
node_types:
  my.nodes.Host:
    capabilities:
      host: my.capabilities.Host
  my.nodes.App:
    requirements:
      - host:
          capability: my.capabilities.Host
          node: my.nodes.Host
          relationship: my.relationships.HostedOn
      - dependency: my.capabilities.Host
topology_template:
  node_templates:
    vm:
      type: my.nodes.Host
    other_vm:
      type: my.nodes.Host
    app:
      type: my.nodes.App
      requirements:
        - host: my.nodes.Host
        - dependency: other_vm
"#,
    )
    .unwrap();

    let app = topology.node("app").unwrap();
    let rendered: Vec<_> = app
        .requirements
        .iter()
        .map(|r| (r.name.as_str(), r.target.as_str(), r.relationship.as_deref()))
        .collect();
    assert_eq!(
        rendered,
        vec![
            ("host", "vm", Some("my.relationships.HostedOn")),
            ("dependency", "other_vm", None),
        ]
    );
}

#[test]
fn test_groups_resolve_members() {
    let topology = build(
        r#"
tosca_definitions_version: tosca_simple_yaml_1_3
node_types:
  my.nodes.Worker: {}
group_types:
  my.groups.Pool:
    properties:
      size: {type: integer, default: 2}
policy_types:
  my.policies.Placement: {}
topology_template:
  node_templates:
    w1: {type: my.nodes.Worker}
    w2: {type: my.nodes.Worker}
  groups:
    pool:
      type: my.groups.Pool
      members: [w1, w2]
  policies:
    - placement: {type: my.policies.Placement, targets: [pool]}
"#,
    )
    .unwrap();

    let pool = &topology.groups["pool"];
    assert_eq!(pool.members, vec!["w1", "w2"]);
    assert_eq!(pool.properties["size"], json!(2));
    // Groups are valid targets but never match node instances
    assert!(topology.policy("placement").unwrap().targets.is_empty());
}

#[test]
fn test_topology_serializes_in_document_order() {
    let topology = build(POLICY_TARGETS).unwrap();
    let json = serde_json::to_value(&topology).unwrap();
    let names: Vec<_> = json["nodes"].as_object().unwrap().keys().cloned().collect();
    assert_eq!(names, vec!["a1", "b1", "a2", "c1"]);
}
