use std::collections::HashMap;

use maplit::hashmap;

use dts_bundler::compiler::Compiler;
use dts_bundler::config::BundleOptions;
use dts_bundler::host::MemoryHost;

fn bundle(files: HashMap<String, String>, options: BundleOptions) -> String {
    let host = MemoryHost::new(files);
    Compiler::new(&host, options)
        .compile("/src/entry.d.ts")
        .unwrap()
}

fn quiet(mut options: BundleOptions) -> BundleOptions {
    options.no_banner = true;
    options
}

#[test]
fn round_trip_reexport() {
    let files = hashmap! {
        "/src/entry.d.ts".to_string() =>
            "import type { LocalType } from './local';\n\
             import type { ExternalType } from '@external/package';\n\
             export interface MyType extends LocalType { external: ExternalType; }\n\
             export {};\n".to_string(),
        "/src/local.d.ts".to_string() =>
            "export interface LocalType { id: string; }\n".to_string(),
    };
    let output = bundle(files, quiet(BundleOptions::default()));
    assert_eq!(
        output,
        "import type { ExternalType } from '@external/package';\n\
         \n\
         interface LocalType { id: string; }\n\
         interface MyType extends LocalType { external: ExternalType; }\n\
         \n\
         export { MyType };\n\
         \n\
         export {};\n"
    );
}

#[test]
fn bundling_is_deterministic() {
    let files = hashmap! {
        "/src/entry.d.ts".to_string() =>
            "export * from './a';\nexport { Foo } from './b';\n".to_string(),
        "/src/a.d.ts".to_string() =>
            "export interface A { foo: Foo; }\nimport { Foo } from './b';\n".to_string(),
        "/src/b.d.ts".to_string() => "export declare class Foo {}\n".to_string(),
    };
    let first = bundle(files.clone(), BundleOptions::default());
    let second = bundle(files, BundleOptions::default());
    assert_eq!(first, second);
}

#[test]
fn colliding_classes_are_renamed_and_referenced_correctly() {
    let files = hashmap! {
        "/src/entry.d.ts".to_string() =>
            "export { Foo } from './a';\nexport { Foo as FooB } from './b';\n".to_string(),
        "/src/a.d.ts".to_string() => "export declare class Foo {}\n".to_string(),
        "/src/b.d.ts".to_string() =>
            "export declare class Foo { other(): Foo; }\n".to_string(),
    };
    let output = bundle(files, quiet(BundleOptions::default()));
    assert!(output.contains("declare class Foo {}"));
    assert!(output.contains("declare class Foo$1 { other(): Foo$1; }"));
    assert!(output.contains("export { Foo, Foo$1 as FooB };"));
}

#[test]
fn star_export_chain_surfaces_deep_names() {
    let files = hashmap! {
        "/src/entry.d.ts".to_string() => "export * from './a';\n".to_string(),
        "/src/a.d.ts".to_string() => "export * from './b';\n".to_string(),
        "/src/b.d.ts".to_string() => "export interface X {}\n".to_string(),
    };
    let output = bundle(files, quiet(BundleOptions::default()));
    assert!(output.contains("interface X {}"));
    assert!(output.contains("export { X };"));
}

#[test]
fn import_cycles_emit_each_declaration_once() {
    let files = hashmap! {
        "/src/entry.d.ts".to_string() =>
            "export * from './a';\nexport * from './b';\n".to_string(),
        "/src/a.d.ts".to_string() =>
            "import { B } from './b';\nexport interface A { b: B; }\n".to_string(),
        "/src/b.d.ts".to_string() =>
            "import { A } from './a';\nexport interface B { a: A; }\n".to_string(),
    };
    let output = bundle(files, quiet(BundleOptions::default()));
    assert_eq!(output.matches("interface A ").count(), 1);
    assert_eq!(output.matches("interface B ").count(), 1);
}

#[test]
fn unreachable_declarations_are_dropped() {
    let files = hashmap! {
        "/src/entry.d.ts".to_string() =>
            "import { Used } from './dep';\nexport interface Api { used: Used; }\n"
                .to_string(),
        "/src/dep.d.ts".to_string() =>
            "export interface Used {}\nexport declare class OnlyInternal {}\n\
             interface Private {}\n".to_string(),
    };
    let output = bundle(files, quiet(BundleOptions::default()));
    assert!(output.contains("interface Used {}"));
    assert!(!output.contains("OnlyInternal"));
    assert!(!output.contains("Private"));
}

#[test]
fn default_export_assignment() {
    let files = hashmap! {
        "/src/entry.d.ts".to_string() =>
            "declare class Main {}\nexport default Main;\n".to_string(),
    };
    let output = bundle(files, quiet(BundleOptions::default()));
    assert!(output.contains("declare class Main {}"));
    assert!(output.ends_with("export default Main;\n"));
}

#[test]
fn export_equals_line() {
    let files = hashmap! {
        "/src/entry.d.ts".to_string() =>
            "declare function lib(): void;\nexport = lib;\n".to_string(),
    };
    let output = bundle(files, quiet(BundleOptions::default()));
    assert!(output.contains("declare function lib(): void;"));
    assert!(output.ends_with("export = lib;\n"));
}

#[test]
fn namespace_reexport_becomes_a_block() {
    let files = hashmap! {
        "/src/entry.d.ts".to_string() => "export * as NS from './a';\n".to_string(),
        "/src/a.d.ts".to_string() =>
            "export interface A {}\nexport interface B {}\n".to_string(),
    };
    let output = bundle(files, quiet(BundleOptions::default()));
    assert!(output.contains("interface A {}"));
    assert!(output.contains("declare namespace NS {\n\texport { A, B };\n}"));
    assert!(output.contains("export { NS };"));
}

#[test]
fn inlined_library_is_pulled_from_node_modules() {
    let files = hashmap! {
        "/src/entry.d.ts".to_string() =>
            "import { LibType } from 'lib';\nexport interface Api { t: LibType; }\n"
                .to_string(),
        "/src/node_modules/lib/index.d.ts".to_string() =>
            "export interface LibType {}\n".to_string(),
    };
    let options = BundleOptions {
        inlined_libraries: vec!["lib".to_string()],
        ..Default::default()
    };
    let output = bundle(files, quiet(options));
    assert!(output.contains("interface LibType {}"));
    assert!(!output.contains("from 'lib'"));
}

#[test]
fn inlined_ambient_module_import_resolves_to_inlined_declaration() {
    let files = hashmap! {
        "/src/entry.d.ts".to_string() =>
            "import './ambient';\n\
             import { Inner } from 'lib';\n\
             export interface Api { inner: Inner; }\n".to_string(),
        "/src/ambient.d.ts".to_string() =>
            "declare module \"lib\" { export interface Inner {} }\n".to_string(),
    };
    let options = BundleOptions {
        inlined_libraries: vec!["lib".to_string()],
        ..Default::default()
    };
    let output = bundle(files, quiet(options));
    assert!(output.contains("interface Inner {}"));
    assert!(output.contains("inner: Inner;"));
    assert!(!output.contains("from 'lib'"));
    assert!(!output.contains("Inner$1"));
}

#[test]
fn const_enum_modifier_follows_option() {
    let files = hashmap! {
        "/src/entry.d.ts".to_string() =>
            "export declare const enum Flags { A = 1 }\n".to_string(),
    };
    let output = bundle(files.clone(), quiet(BundleOptions::default()));
    assert!(output.contains("declare const enum Flags { A = 1 }"));

    let options = BundleOptions {
        respect_preserve_const_enum: true,
        ..Default::default()
    };
    let output = bundle(files, quiet(options));
    assert!(output.contains("declare enum Flags { A = 1 }"));
}

#[test]
fn banner_and_umd_lines() {
    let files = hashmap! {
        "/src/entry.d.ts".to_string() => "export interface Api {}\n".to_string(),
    };
    let options = BundleOptions {
        umd_module_name: Some("MyLib".to_string()),
        ..Default::default()
    };
    let output = bundle(files, options);
    assert!(output.starts_with("// Generated by dts-bundler v"));
    assert!(output.ends_with("export as namespace MyLib;\n"));
}

#[test]
fn passthrough_reexport_from_external_module() {
    let files = hashmap! {
        "/src/entry.d.ts".to_string() =>
            "export { Writable as Sink } from 'stream';\nexport interface Api {}\n"
                .to_string(),
    };
    let output = bundle(files, quiet(BundleOptions::default()));
    assert!(output.contains("export { Writable as Sink } from 'stream';"));
}

#[test]
fn consolidated_external_imports() {
    let files = hashmap! {
        "/src/entry.d.ts".to_string() =>
            "import { Readable } from 'stream';\n\
             import { Writable } from 'stream';\n\
             export interface Api { input: Readable; output: Writable; }\n".to_string(),
    };
    let output = bundle(files, quiet(BundleOptions::default()));
    assert!(output.contains("import { Readable, Writable } from 'stream';"));
}

#[test]
fn merged_interfaces_keep_one_name() {
    let files = hashmap! {
        "/src/entry.d.ts".to_string() =>
            "export interface Config { a: string; }\nexport { Config } from './base';\n"
                .to_string(),
        "/src/base.d.ts".to_string() =>
            "export interface Config { b: string; }\n".to_string(),
    };
    let output = bundle(files, quiet(BundleOptions::default()));
    assert_eq!(output.matches("interface Config {").count(), 2);
    assert!(!output.contains("Config$1"));
    assert!(output.contains("export { Config };"));
}
