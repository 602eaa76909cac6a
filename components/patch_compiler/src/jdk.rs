//! Built-in model of the core runtime classes
//!
//! Only the members commonly reached from patch code are listed. Classes of
//! the workspace itself shadow these entries.

use crate::workspace::{ClassInfo, FieldInfo, MethodInfo};

const STRING: &str = "Ljava/lang/String;";

fn print_stream() -> ClassInfo {
    let mut class = ClassInfo::new("java/io/PrintStream");
    for name in ["print", "println"] {
        for param in [
            "Z",
            "C",
            "I",
            "J",
            "F",
            "D",
            "[C",
            STRING,
            "Ljava/lang/Object;",
        ] {
            class = class.with_method(MethodInfo::new(name, format!("({})V", param)));
        }
    }
    class
        .with_method(MethodInfo::new("println", "()V"))
        .with_method(MethodInfo::new("flush", "()V"))
}

fn string_builder() -> ClassInfo {
    let mut class = ClassInfo::new("java/lang/StringBuilder")
        .implements("java/lang/CharSequence")
        .with_method(MethodInfo::new("<init>", "()V"))
        .with_method(MethodInfo::new("<init>", format!("({})V", STRING)))
        .with_method(MethodInfo::new("toString", format!("(){}", STRING)))
        .with_method(MethodInfo::new("length", "()I"))
        .with_method(MethodInfo::new("reverse", "()Ljava/lang/StringBuilder;"));
    for param in [
        "Z",
        "C",
        "I",
        "J",
        "F",
        "D",
        STRING,
        "Ljava/lang/Object;",
        "Ljava/lang/CharSequence;",
    ] {
        class = class.with_method(MethodInfo::new(
            "append",
            format!("({})Ljava/lang/StringBuilder;", param),
        ));
    }
    class
}

fn boxed(name: &str, primitive: &str, parse: Option<&str>) -> ClassInfo {
    let internal = format!("java/lang/{}", name);
    let object = format!("L{};", internal);
    let mut class = ClassInfo::new(internal.clone())
        .with_method(MethodInfo::new_static(
            "valueOf",
            format!("({}){}", primitive, object),
        ))
        .with_method(MethodInfo::new_static(
            "toString",
            format!("({}){}", primitive, STRING),
        ));
    if let Some(parse) = parse {
        class = class.with_method(MethodInfo::new_static(
            parse,
            format!("({}){}", STRING, primitive),
        ));
    }
    if name != "Boolean" && name != "Character" {
        class = class
            .extends("java/lang/Number")
            .with_field(FieldInfo::new_static("MAX_VALUE", primitive))
            .with_field(FieldInfo::new_static("MIN_VALUE", primitive));
    }
    class
}

fn throwable(name: &str, super_name: &str) -> ClassInfo {
    ClassInfo::new(format!("java/lang/{}", name))
        .extends(format!("java/lang/{}", super_name))
        .with_method(MethodInfo::new("<init>", "()V"))
        .with_method(MethodInfo::new("<init>", format!("({})V", STRING)))
}

/// Runtime classes available to every workspace
pub fn runtime_classes() -> Vec<ClassInfo> {
    let mut classes = vec![
        ClassInfo::new("java/lang/Object")
            .with_method(MethodInfo::new("<init>", "()V"))
            .with_method(MethodInfo::new("toString", format!("(){}", STRING)))
            .with_method(MethodInfo::new("hashCode", "()I"))
            .with_method(MethodInfo::new("equals", "(Ljava/lang/Object;)Z"))
            .with_method(MethodInfo::new("getClass", "()Ljava/lang/Class;")),
        ClassInfo::interface("java/lang/CharSequence")
            .with_method(MethodInfo::new("length", "()I"))
            .with_method(MethodInfo::new("charAt", "(I)C")),
        ClassInfo::new("java/lang/String")
            .implements("java/lang/CharSequence")
            .with_method(MethodInfo::new("<init>", "()V"))
            .with_method(MethodInfo::new("length", "()I"))
            .with_method(MethodInfo::new("isEmpty", "()Z"))
            .with_method(MethodInfo::new("charAt", "(I)C"))
            .with_method(MethodInfo::new("trim", format!("(){}", STRING)))
            .with_method(MethodInfo::new("toUpperCase", format!("(){}", STRING)))
            .with_method(MethodInfo::new("toLowerCase", format!("(){}", STRING)))
            .with_method(MethodInfo::new("concat", format!("({}){}", STRING, STRING)))
            .with_method(MethodInfo::new("substring", format!("(I){}", STRING)))
            .with_method(MethodInfo::new("substring", format!("(II){}", STRING)))
            .with_method(MethodInfo::new("indexOf", format!("({})I", STRING)))
            .with_method(MethodInfo::new(
                "contains",
                "(Ljava/lang/CharSequence;)Z",
            ))
            .with_method(MethodInfo::new("startsWith", format!("({})Z", STRING)))
            .with_method(MethodInfo::new_static("valueOf", format!("(I){}", STRING)))
            .with_method(MethodInfo::new_static("valueOf", format!("(J){}", STRING)))
            .with_method(MethodInfo::new_static("valueOf", format!("(D){}", STRING)))
            .with_method(MethodInfo::new_static("valueOf", format!("(Z){}", STRING)))
            .with_method(MethodInfo::new_static(
                "valueOf",
                format!("(Ljava/lang/Object;){}", STRING),
            )),
        string_builder(),
        ClassInfo::new("java/lang/System")
            .with_field(FieldInfo::new_static("out", "Ljava/io/PrintStream;"))
            .with_field(FieldInfo::new_static("err", "Ljava/io/PrintStream;"))
            .with_method(MethodInfo::new_static("currentTimeMillis", "()J"))
            .with_method(MethodInfo::new_static("nanoTime", "()J"))
            .with_method(MethodInfo::new_static(
                "arraycopy",
                "(Ljava/lang/Object;ILjava/lang/Object;II)V",
            ))
            .with_method(MethodInfo::new_static(
                "getProperty",
                format!("({}){}", STRING, STRING),
            )),
        ClassInfo::new("java/lang/Math")
            .with_field(FieldInfo::new_static("PI", "D"))
            .with_method(MethodInfo::new_static("abs", "(I)I"))
            .with_method(MethodInfo::new_static("abs", "(J)J"))
            .with_method(MethodInfo::new_static("abs", "(D)D"))
            .with_method(MethodInfo::new_static("max", "(II)I"))
            .with_method(MethodInfo::new_static("max", "(JJ)J"))
            .with_method(MethodInfo::new_static("max", "(DD)D"))
            .with_method(MethodInfo::new_static("min", "(II)I"))
            .with_method(MethodInfo::new_static("min", "(JJ)J"))
            .with_method(MethodInfo::new_static("min", "(DD)D"))
            .with_method(MethodInfo::new_static("sqrt", "(D)D"))
            .with_method(MethodInfo::new_static("pow", "(DD)D"))
            .with_method(MethodInfo::new_static("random", "()D")),
        ClassInfo::new("java/lang/Number")
            .with_method(MethodInfo::new("intValue", "()I"))
            .with_method(MethodInfo::new("longValue", "()J"))
            .with_method(MethodInfo::new("doubleValue", "()D")),
        boxed("Integer", "I", Some("parseInt")),
        boxed("Long", "J", Some("parseLong")),
        boxed("Double", "D", Some("parseDouble")),
        boxed("Boolean", "Z", Some("parseBoolean")),
        boxed("Character", "C", None),
        ClassInfo::new("java/lang/Thread")
            .with_method(MethodInfo::new_static("sleep", "(J)V"))
            .with_method(MethodInfo::new_static(
                "currentThread",
                "()Ljava/lang/Thread;",
            ))
            .with_method(MethodInfo::new("getName", format!("(){}", STRING))),
        ClassInfo::new("java/lang/Class")
            .with_method(MethodInfo::new("getName", format!("(){}", STRING))),
        print_stream(),
        ClassInfo::new("java/lang/Throwable")
            .with_method(MethodInfo::new("<init>", "()V"))
            .with_method(MethodInfo::new("<init>", format!("({})V", STRING)))
            .with_method(MethodInfo::new("getMessage", format!("(){}", STRING)))
            .with_method(MethodInfo::new("printStackTrace", "()V")),
    ];
    classes.extend([
        throwable("Exception", "Throwable"),
        throwable("RuntimeException", "Exception"),
        throwable("IllegalStateException", "RuntimeException"),
        throwable("IllegalArgumentException", "RuntimeException"),
    ]);
    classes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_println_overloads() {
        let classes = runtime_classes();
        let stream = classes
            .iter()
            .find(|c| c.name == "java/io/PrintStream")
            .unwrap();
        assert!(stream.method("println", "(I)V").is_some());
        assert!(stream.method("println", "(Ljava/lang/String;)V").is_some());
        assert!(stream.method("println", "()V").is_some());
    }

    #[test]
    fn test_names_are_unique() {
        let classes = runtime_classes();
        let mut names: Vec<&str> = classes.iter().map(|c| c.name.as_str()).collect();
        names.sort_unstable();
        let before = names.len();
        names.dedup();
        assert_eq!(before, names.len());
    }

    #[test]
    fn test_boxed_number_hierarchy() {
        let classes = runtime_classes();
        let integer = classes.iter().find(|c| c.name == "java/lang/Integer").unwrap();
        assert_eq!(integer.super_name.as_deref(), Some("java/lang/Number"));
        assert!(integer.method("parseInt", "(Ljava/lang/String;)I").unwrap().is_static);
    }
}
