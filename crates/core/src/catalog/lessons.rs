//! Lesson content and validation predicates.

use crate::model::Lesson;

pub(super) static LESSONS: [Lesson; 5] = [
    Lesson::new(
        "intro",
        "👋 Introduction to Python",
        r#"Welcome to the world of Python! Think of Python as a powerful set of instructions you can give to your computer. It's famous for its simple and readable syntax, making it a perfect language for beginners.

The most basic command is `print()`, which displays information to the screen. Text data, known as a **string**, must be wrapped in single `'` or double `"` quotes."#,
        "Use `print()` to display output. Text (strings) needs to be inside quotes.",
        r"# This is a comment. Python ignores it.
print('Hello, programming world!')

# You can also print numbers
print(42)",
        "Write a program that asks for the user's name and then greets them personally.",
        "You'll need the `input()` function to get data from the user. `input()` returns a string.",
        r#"name = input("What is your name? ")
print(f"Hello, {name}!")"#,
        validate_intro,
    ),
    Lesson::new(
        "variables",
        "📦 Variables & Data Types",
        r#"A **variable** is a container for storing a value. You can give it a name and retrieve the value later by using that name. This is fundamental to programming!

Python has several essential **data types**:
- **String (`str`)**: Plain text (e.g., `"Alice"`).
- **Integer (`int`)**: Whole numbers (e.g., `30`).
- **Float (`float`)**: Numbers with decimals (e.g., `3.14`).
- **Boolean (`bool`)**: Represents truth values, which can only be `True` or `False`."#,
        "Variables store data. Common types are strings, integers, floats, and booleans.",
        r#"name = 'Alice'
age = 30
pi_value = 3.14
is_learning = True

print(f"{name} is {age} years old.")"#,
        "Create two variables, `num1` and `num2`, assign them any two numbers, and then print their sum.",
        "Create two variables, like `num1 = 10`. Then, you can print their sum directly: `print(num1 + num2)`.",
        r#"num1 = 15
num2 = 10
result = num1 + num2
print(f"The sum is: {result}")"#,
        validate_variables,
    ),
    Lesson::new(
        "data_structures",
        "📚 Data Structures: Lists & Dictionaries",
        r"So far, we've stored one value in a variable. But what if you need to store many? That's where data structures come in.

- **List (`list`)**: An ordered, changeable collection of items. Lists are defined with square brackets `[]`. You can access items by their position (index), which starts at 0.
- **Dictionary (`dict`)**: An unordered collection of `key:value` pairs. Dictionaries are defined with curly braces `{}`. You access values using their unique key.",
        "Use lists `[]` for ordered items and dictionaries `{}` for key-value pairs.",
        r#"# A list of skills
skills = ['Python', 'Data Analysis', 'Web Dev']
print(f"First skill: {skills[0]}") # Access the first item

# A dictionary describing a person
person = {'name': 'John', 'age': 32}
print(f"{person['name']} is {person['age']}.")"#,
        "Create a dictionary representing a book with keys 'title', 'author', and 'year'. Then, print a sentence describing the book.",
        "Create the dictionary: `my_book = {'title': '...', ...}`. Use f-strings to access the values for printing.",
        r#"book = {
    'title': 'The Hitchhiker\'s Guide to the Galaxy',
    'author': 'Douglas Adams',
    'year': 1979
}

print(f"{book['title']} by {book['author']} was published in {book['year']}.")"#,
        validate_data_structures,
    ),
    Lesson::new(
        "control_flow",
        "🚦 Control Flow: if/else & loops",
        r"**Control flow** statements allow your program to make decisions and repeat actions.

- **`if`, `elif`, `else`**: These are used for decision-making. The code inside an `if` block runs only if its condition is `True`.
- **`for` loop**: This is used to iterate over a sequence (like a list). For each item in the sequence, the loop's code block is executed once.",
        "`if`/`else` lets your code make choices. `for` loops let your code perform repetitive tasks.",
        r#"age = 20

if age < 18:
    print('You are a minor.')
else:
    print('You are an adult.')

# A simple for loop
for i in range(3): # range(3) provides numbers 0, 1, 2
    print(f"Looping, number {i}")"#,
        r#"Write a `for` loop that iterates through numbers 1 to 10. If a number is even, print `f"{number} is even"`. If it's odd, print `f"{number} is odd"`."#,
        "Use `range(1, 11)` to get numbers from 1 to 10. Inside the loop, use the modulo operator (`%`). `number % 2 == 0` is `True` if the number is even.",
        r#"for number in range(1, 11):
    if number % 2 == 0:
        print(f"{number} is even")
    else:
        print(f"{number} is odd")"#,
        validate_control_flow,
    ),
    Lesson::new(
        "functions",
        "🧩 Functions",
        r"**Functions** are reusable blocks of code designed to perform a single, specific task. You define a function with the `def` keyword.
This helps you avoid repeating code (a principle called DRY - Don't Repeat Yourself) and makes your programs much more organized.

A function can take inputs (called **arguments**) and can optionally send back a result using the `return` keyword.",
        "Functions group code into reusable blocks. Define with `def` and return values with `return`.",
        r#"# Defining a function that takes one argument
def greet(name):
    return f"Hello there, {name}!"

# Calling the function
message = greet("Alex")
print(message)"#,
        "Write a function called `calculate_area` that takes the `width` and `height` of a rectangle as arguments and returns its area.",
        "Define your function as `def calculate_area(width, height):`. The area is `width * height`. Use `return` to send back the result.",
        r#"def calculate_area(width, height):
    return width * height

# Test the function
area = calculate_area(10, 5)
print(f"The area is: {area}")"#,
        validate_functions,
    ),
];

// An empty input is contained in every output, as with a plain substring check.
fn validate_intro(output: &str, simulated_input: &str) -> bool {
    let output = output.to_lowercase();
    output.contains(&simulated_input.to_lowercase()) && output.contains("hello")
}

fn validate_variables(output: &str, _simulated_input: &str) -> bool {
    output.to_lowercase().contains("sum is: 25") || output.contains("25")
}

fn validate_data_structures(output: &str, _simulated_input: &str) -> bool {
    let lower = output.to_lowercase();
    lower.contains("hitchhiker") && lower.contains("douglas adams") && output.contains("1979")
}

fn validate_control_flow(output: &str, _simulated_input: &str) -> bool {
    let lower = output.to_lowercase();
    lower.contains("1 is odd") && lower.contains("10 is even") && lower.contains("5 is odd")
}

fn validate_functions(output: &str, _simulated_input: &str) -> bool {
    output.contains("50")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intro_requires_name_and_greeting() {
        assert!(validate_intro("What is your name? Hello, Sam!\n", "Sam"));
        assert!(validate_intro("HELLO SAM", "sam"));
        assert!(!validate_intro("Hello, stranger!\n", "Sam"));
        assert!(!validate_intro("Sam\n", "Sam"));
    }

    #[test]
    fn variables_accepts_any_25() {
        assert!(validate_variables("The sum is: 25\n", ""));
        assert!(validate_variables("25\n", ""));
        assert!(!validate_variables("24\n", ""));
    }

    #[test]
    fn data_structures_checks_all_fields() {
        assert!(validate_data_structures(
            "The Hitchhiker's Guide to the Galaxy by Douglas Adams was published in 1979.",
            ""
        ));
        assert!(!validate_data_structures("Hitchhiker by Douglas Adams", ""));
    }

    #[test]
    fn control_flow_checks_parity_lines() {
        assert!(validate_control_flow("1 is odd\n5 is odd\n10 is even\n", ""));
        assert!(!validate_control_flow("1 is odd\n5 is odd\n", ""));
    }

    #[test]
    fn functions_checks_area() {
        assert!(validate_functions("The area is: 50\n", ""));
        assert!(!validate_functions("The area is: 15\n", ""));
    }
}
