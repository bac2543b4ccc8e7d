// SPDX-License-Identifier: (MIT OR Apache-2.0)

use graft_emit::{emit, EmitOptions};
use graft_model::Program;
use graft_plan::{helper_name, plan, PlanConfig};

macro_rules! fixture {
    ($name:literal) => {
        graft_model::from_json(include_str!(concat!("../../../fixtures/", $name, ".json")))
            .expect("fixture parses")
    };
}

fn options() -> EmitOptions {
    EmitOptions {
        debug: false,
        command: "graftgen -interface=X -output=graft_gen.go".to_string(),
        version: "test".to_string(),
    }
}

fn render(program: &Program, interfaces: &[&str], options: &EmitOptions) -> String {
    let plan = plan(program, &PlanConfig::new(interfaces.iter().copied())).expect("plan succeeds");
    emit(&plan, program, options)
}

#[test]
fn basic_file() {
    let program = fixture!("basic");
    let out = render(&program, &["UserMapper"], &options());
    let h = helper_name("User->UserDTO");
    let expected = format!(
        "// Code generated by graftgen test. DO NOT EDIT.
// Command: graftgen -interface=X -output=graft_gen.go
// Source: UserMapper

package basic

type userMapperImpl struct{{}}

// NewUserMapper returns the generated implementation of UserMapper.
func NewUserMapper() UserMapper {{
\treturn &userMapperImpl{{}}
}}

func (m *userMapperImpl) UserToDTO(p0 User) UserDTO {{
\treturn {h}(p0)
}}

func {h}(in User) UserDTO {{
\tvar dst UserDTO
\tdst.ID = in.ID
\tdst.Name = in.Name
\treturn dst
}}
"
    );
    assert_eq!(out, expected);
}

#[test]
fn failing_calls_check_err() {
    let program = fixture!("collections");
    let out = render(&program, &["ColMapper"], &options());
    let elem = helper_name("Elem->ElemDTO");
    let slice = helper_name("comp:[]Elem->[]ElemDTO");

    assert!(out.contains(&format!(
        "func {elem}(in Elem) (ElemDTO, error) {{
\tvar err error
\tvar dst ElemDTO
\tdst, err = ElemToElemDTO(in)
\tif err != nil {{
\t\treturn dst, err
\t}}
\treturn dst, nil
}}"
    )));
    assert!(out.contains(&format!(
        "func (m *colMapperImpl) Map(p0 []Elem) ([]ElemDTO, error) {{
\treturn {slice}(p0)
}}"
    )));
    assert!(out.contains(
        "\tif in != nil {
\t\tdst = make([]ElemDTO, len(in))
\t\tfor i1, v1 := range in {
\t\t\tvar mapped1 ElemDTO
"
    ));
    assert!(out.contains("\t\tdst.Items = make(map[string]ElemDTO, len(in.Items))\n"));
    assert!(out.contains(", err = ElemToElemDTO(v"));
}

#[test]
fn pointer_guards_and_addresses() {
    let program = fixture!("ptr");
    let out = render(&program, &["UserMapper"], &options());
    let value = helper_name("User->UserDTO");

    assert!(out.contains(&format!(
        "func (m *userMapperImpl) ToDTOFromPtr(p0 *User) UserDTO {{
\tif p0 == nil {{
\t\treturn UserDTO{{}}
\t}}
\treturn {value}(*p0)
}}"
    )));
    assert!(out.contains(
        "\tvar mapped UserDTO
\tmapped.ID = p0.ID
\tmapped.Name = p0.Name
\treturn &mapped
"
    ));
    let ptr = helper_name("*User->*UserDTO");
    assert!(out.contains(&format!(
        "func {ptr}(in *User) *UserDTO {{
\tif in == nil {{
\t\treturn nil
\t}}
\tvar mapped UserDTO
\tmapped = {value}(*in)
\treturn &mapped
}}"
    )));
}

#[test]
fn mapsrc_paths_render_as_selectors() {
    let program = fixture!("mapsrc_rules");
    let out = render(&program, &["Builder", "CardBuilder"], &options());
    assert!(out.contains("\tdst.Name = in.P.Name\n\tdst.Code = in.P.Detail.Code\n"));
    assert!(out.contains("\tdst.Label = in.Label\n"));
    assert!(out.contains(
        "func (m *cardBuilderImpl) Card(ctx context.Context, in Input) Card {
\tvar dst Card
\tdst.UserName = in.P.Name
\tdst.Label = in.Label
\treturn dst
}"
    ));
}

#[test]
fn context_is_threaded() {
    let program = fixture!("context");
    let out = render(&program, &["CtxMapper"], &options());
    let h = helper_name("In->Out");
    assert!(out.contains("import \"context\"\n"));
    assert!(out.contains(&format!("func {h}(ctx context.Context, in In) Out {{")));
    assert!(out.contains(&format!("\treturn {h}(p0, p1)\n")));
    assert!(out.contains(&format!("\treturn {h}(c, in)\n")));
    assert!(out.contains("func (m *ctxMapperImpl) MapNamedCtx(c context.Context, in In) Out {"));
}

#[test]
fn diagnostics_become_comments() {
    let program = fixture!("aliases");
    let out = render(&program, &["AccountMapper"], &options());
    assert!(out.contains("\tdst.Age = int64(in.Age)\n"));
    assert!(out.contains("\tdst.Temp = float64(in.Temp)\n"));
    assert!(out.contains("\t// unsupported: cannot map int to string for dst.Count\n"));
    assert!(out.contains("\t// unresolved Missing: no source for Missing\n"));
    assert!(!out.contains("hidden"));
}

#[test]
fn debug_paths_label_nodes() {
    let program = fixture!("nested");
    let opts = EmitOptions {
        debug: true,
        ..options()
    };
    let out = render(&program, &["AddressMapper", "UserMapper"], &opts);
    // AddressMapper sorts first
    assert!(out.contains("\t// I0.M0.0\n\treturn "));
    assert!(out.contains("\t// I1.M0.0\n"));
    assert!(out.contains("\t// H0.0\n\tvar dst "));
    assert!(out.contains("\t// H1.3\n"));

    let plain = render(&program, &["AddressMapper", "UserMapper"], &options());
    assert!(!plain.contains("// H0.0"));
}

#[test]
fn optional_fields_are_nil_guarded() {
    let program = fixture!("linked");
    let out = render(&program, &["ListMapper"], &options());
    let node = helper_name("Node->NodeDTO");
    let ptr = helper_name("*Node->*NodeDTO");
    // the pointer helper unwraps and defers to the value helper
    assert!(out.contains(&format!(
        "func {ptr}(in *Node) *NodeDTO {{
\tif in == nil {{
\t\treturn nil
\t}}
\tvar mapped NodeDTO
\tmapped = {node}(*in)
\treturn &mapped
}}"
    )));
    assert!(out.contains(&format!(
        "\tif in.Next != nil {{
\t\tvar mapped2 NodeDTO
\t\tmapped2 = {node}(*in.Next)
\t\tdst.Next = &mapped2
\t}}"
    )));
    assert!(!out.contains("mapped.Next"));
}
