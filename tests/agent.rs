use maze_chase::agent::{Agent, AgentTiming};
use maze_chase::{Cell, Grid};

fn timing() -> AgentTiming {
    AgentTiming {
        step_interval: 1.0,
        pathfind_interval: 0.5,
    }
}

#[test]
fn chases_static_target_in_manhattan_moves() {
    let grid = Grid::bordered(10, 10);
    let target = Cell::new(6, 7);
    let mut agent = Agent::new(Cell::new(1, 1), 0.0, timing());

    let mut moves = 0;
    let mut now = 0.0;
    while agent.position() != target {
        now += 1.0;
        agent.update_path(&grid, target, now);
        if agent.update(now) {
            moves += 1;
        }
        assert!(now < 100.0, "agent never arrived");
    }
    assert!(moves <= Cell::new(1, 1).manhattan(target));
}

#[test]
fn waits_for_the_step_interval() {
    let grid = Grid::bordered(6, 6);
    let mut agent = Agent::new(Cell::new(1, 1), 0.0, timing());
    agent.update_path(&grid, Cell::new(4, 4), 0.0);
    assert!(agent.path().len() > 0);

    assert!(!agent.update(0.5));
    assert_eq!(agent.position(), Cell::new(1, 1));
    assert!(agent.update(1.0));
    assert!(!agent.update(1.5));
    assert!(agent.update(2.0));
}

#[test]
fn speed_multiplier_shortens_the_interval() {
    let grid = Grid::bordered(6, 6);
    let mut agent = Agent::new(Cell::new(1, 1), 0.0, timing()).with_speed_multiplier(2.0);
    agent.update_path(&grid, Cell::new(4, 4), 0.0);
    assert!(!agent.update(0.25));
    assert!(agent.update(0.5));
}

#[test]
fn frozen_agent_neither_moves_nor_replans() {
    let grid = Grid::bordered(10, 10);
    let mut agent = Agent::new(Cell::new(1, 1), 0.0, timing());
    agent.update_path(&grid, Cell::new(8, 8), 0.0);
    let cached: Vec<Cell> = agent.path().copied().collect();

    agent.freeze(1.0, 3.0);
    for now in [1.0, 1.5, 2.0, 3.0, 3.99] {
        assert!(agent.is_frozen(now));
        agent.update_path(&grid, Cell::new(1, 8), now);
        assert!(!agent.update(now));
        assert_eq!(agent.position(), Cell::new(1, 1));
    }
    assert_eq!(agent.path().copied().collect::<Vec<_>>(), cached);

    assert!(!agent.is_frozen(4.0));
    assert!(agent.update(4.0));
}

#[test]
fn refreezing_replaces_the_deadline() {
    let mut agent = Agent::new(Cell::new(1, 1), 0.0, timing());
    agent.freeze(0.0, 10.0);
    agent.freeze(2.0, 3.0);
    assert_eq!(agent.frozen_until(), Some(5.0));
    assert!(!agent.is_frozen(5.0));
}

#[test]
fn replans_when_target_jumps() {
    let grid = Grid::bordered(10, 10);
    let mut agent = Agent::new(Cell::new(1, 1), 0.0, timing());
    agent.update_path(&grid, Cell::new(1, 8), 0.0);
    assert_eq!(agent.path().last(), Some(&Cell::new(1, 8)));

    agent.update_path(&grid, Cell::new(8, 8), 0.1);
    assert_eq!(agent.path().last(), Some(&Cell::new(8, 8)));

    // One-cell drift inside the interval keeps the old plan.
    agent.update_path(&grid, Cell::new(8, 7), 0.2);
    assert_eq!(agent.path().last(), Some(&Cell::new(8, 8)));

    agent.update_path(&grid, Cell::new(8, 7), 0.7);
    assert_eq!(agent.path().last(), Some(&Cell::new(8, 7)));
}

#[test]
fn greedy_step_when_target_is_unreachable() {
    let grid = Grid::from_rows(&[
        "#########",
        "#.......#",
        "#.....###",
        "#.....#.#",
        "#.....###",
        "#########",
    ]);
    let mut agent = Agent::new(Cell::new(3, 2), 0.0, timing());
    agent.update_path(&grid, Cell::new(3, 7), 0.0);
    assert_eq!(agent.path().copied().collect::<Vec<_>>(), vec![Cell::new(3, 3)]);
    assert!(agent.update(1.0));
    assert_eq!(agent.position(), Cell::new(3, 3));
}

#[test]
fn greedy_step_tries_other_directions_when_blocked() {
    let grid = Grid::from_rows(&[
        "#######",
        "#.....#",
        "#.#####",
        "#.#.#.#",
        "#######",
    ]);
    // Target (3,5) is sealed off; the dominant direction (right) from (3,1)
    // is a wall, so the first open direction wins: up.
    let mut agent = Agent::new(Cell::new(3, 1), 0.0, timing());
    agent.update_path(&grid, Cell::new(3, 5), 0.0);
    assert_eq!(agent.path().copied().collect::<Vec<_>>(), vec![Cell::new(2, 1)]);
}

#[test]
fn boxed_in_agent_stays_put() {
    let grid = Grid::from_rows(&["#####", "#.#.#", "#####"]);
    let mut agent = Agent::new(Cell::new(1, 1), 0.0, timing());
    agent.update_path(&grid, Cell::new(1, 3), 0.0);
    assert_eq!(agent.path().len(), 0);
    assert!(!agent.update(1.0));
    assert_eq!(agent.position(), Cell::new(1, 1));
}
