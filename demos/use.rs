use avl_set::AvlTreeSet;

fn main() {
    let mut set = AvlTreeSet::new();
    for x in [5, 3, 8, 1, 4, 8, 7] {
        set.insert(x);
    }
    assert_eq!(set.len(), 6);
    assert!(set.contains(&4));

    set.remove(&4);
    assert!(!set.contains(&4));

    println!("height: {}", set.height());

    print!("{{ ");
    for x in &set {
        print!("{x}, ");
    }
    println!("}}");
}
