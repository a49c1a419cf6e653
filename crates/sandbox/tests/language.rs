use sandbox::execute;

fn run(source: &str) -> String {
    execute(source, "")
}

#[test]
fn arithmetic_follows_python() {
    assert_eq!(run("print(7 // 2, -7 // 2, 7 % -3, 7 / 2, 2 ** 10)"), "3 -4 -2 3.5 1024\n");
    assert_eq!(run("print(0.1 + 0.2, 1e20, 10 / 5)"), "0.30000000000000004 1e+20 2.0\n");
    assert_eq!(run("print(round(2.5), round(3.14159, 2), abs(-4))"), "2 3.14 4\n");
}

#[test]
fn strings_and_methods() {
    let source = r#"
s = "  Hello, World  "
print(s.strip().lower(), s.split(","), "-".join(["a", "b"]))
print("abc".upper().startswith("AB"), "banana".count("a"), "banana".find("n"))
print("x={:>5}|{:<4}|{:^6.1f}".format(1, "ab", 2.31))
print("%s is %d" % ("age", 30))
"#;
    assert_eq!(
        run(source),
        "hello, world ['  Hello', ' World  '] a-b\nTrue 3 2\nx=    1|ab  | 2.3  \nage is 30\n"
    );
}

#[test]
fn f_strings_with_specs() {
    let source = r#"
price = 1234.5
name = "Ada"
print(f"{name!r:>6} {price:,.2f} {0.256:.1%} {42:08d} {price=}")
"#;
    assert_eq!(run(source), " 'Ada' 1,234.50 25.6% 00000042 price=1234.5\n");
}

#[test]
fn collections_behave() {
    let source = r#"
nums = [3, 1, 2]
nums.append(5)
nums.sort()
print(nums, nums[-1], nums[1:3], len(nums))
d = {"a": 1}
d["b"] = 2
print(d, d.get("z", 0), list(d.keys()))
s = {1, 2, 2, 3}
print(s, 2 in s, tuple(nums))
print([x * 2 for x in range(5) if x % 2 == 0], {k: v for k, v in d.items()})
print(sum([1, 2, 3]), min(4, 2, 8), max([1, 9, 3]))
"#;
    assert_eq!(
        run(source),
        "[1, 2, 3, 5] 5 [2, 3] 4\n\
         {'a': 1, 'b': 2} 0 ['a', 'b']\n\
         {1, 2, 3} True (1, 2, 3, 5)\n\
         [0, 4, 8] {'a': 1, 'b': 2}\n\
         6 2 9\n"
    );
}

#[test]
fn control_flow_and_functions() {
    let source = r#"
def fib(n):
    if n < 2:
        return n
    return fib(n - 1) + fib(n - 2)

results = []
i = 0
while True:
    i += 1
    if i > 10:
        break
    if i % 3 == 0:
        continue
    results.append(fib(i))
print(results)
print("even" if len(results) % 2 == 0 else "odd")
"#;
    assert_eq!(run(source), "[1, 1, 3, 5, 13, 21, 55]\nodd\n");
}

#[test]
fn runtime_errors_name_kind_and_line() {
    assert_eq!(
        run("x = [1, 2]\nprint(x[5])"),
        "Runtime Error:\nIndexError: list index out of range (line 2)"
    );
    assert_eq!(
        run("d = {}\n\nd['k']"),
        "Runtime Error:\nKeyError: 'k' (line 3)"
    );
    assert_eq!(
        run("print('a' + 1)"),
        "Runtime Error:\nTypeError: can only concatenate str (not \"int\") to str (line 1)"
    );
}
