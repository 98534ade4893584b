//! Which grids a projection reaches

#[cfg(not(feature = "std"))]
use crate::compat::*;

use hashbrown::HashSet;

use super::{Affected, DamageType, Projection};
use crate::consts::MAX_RANGE;
use crate::dungeon::{Coord, ProjectFlags, distance};
use crate::world::World;

/// `tan(d)` scaled by 1000 for whole degrees 0 to 45
const TAN_TABLE: [i32; 46] = [
    0, 17, 35, 52, 70, 87, 105, 123, 141, 158, 176, 194, 213, 231, 249, 268, 287, 306, 325, 344,
    364, 384, 404, 424, 445, 466, 488, 510, 532, 554, 577, 601, 625, 649, 675, 700, 727, 754, 781,
    810, 839, 869, 900, 933, 966, 1000,
];

/// Angle of the offset `(dy, dx)` in whole degrees, 0 to 359, measured
/// anticlockwise from east with north at 90. `y` grows southwards.
pub fn angle_to(dy: i32, dx: i32) -> i32 {
    if dy == 0 && dx == 0 {
        return 0;
    }
    let north = -dy;
    let (ay, ax) = (north.abs(), dx.abs());

    // angle within the first octant, from the smaller over the larger leg
    let (small, large) = if ay <= ax { (ay, ax) } else { (ax, ay) };
    let ratio = small * 1000 / large;
    let mut base = 0;
    while base < 45 && TAN_TABLE[base as usize + 1] <= ratio {
        base += 1;
    }
    if base < 45 {
        let lo = TAN_TABLE[base as usize];
        let hi = TAN_TABLE[base as usize + 1];
        if ratio - lo > hi - ratio {
            base += 1;
        }
    }
    let first_quadrant = if ay <= ax { base } else { 90 - base };

    let angle = match (dx >= 0, north >= 0) {
        (true, true) => first_quadrant,
        (false, true) => 180 - first_quadrant,
        (false, false) => 180 + first_quadrant,
        (true, false) => 360 - first_quadrant,
    };
    angle % 360
}

/// Difference between two angles, 0 to 180
fn angle_diff(a: i32, b: i32) -> i32 {
    let d = (a - b).rem_euclid(360);
    d.min(360 - d)
}

/// Trace the projection and collect every grid it affects, nearest to the
/// centre first. Fixes up the flags for types that need them.
pub(crate) fn affected_grids(world: &mut World, proj: &mut Projection) -> Vec<Affected> {
    let flags = proj.flags;

    if proj.origin == proj.target && !flags.contains(ProjectFlags::BOOM) {
        return vec![Affected { c: proj.target, dist: 0 }];
    }

    let mut grids: Vec<Affected> = Vec::new();
    let mut centre = proj.origin;

    if !flags.intersects(ProjectFlags::ARC | ProjectFlags::STAR) {
        let range = if flags.contains(ProjectFlags::BOOM) || proj.rad <= 0 {
            MAX_RANGE
        } else {
            proj.rad
        };
        let path = world.grid.project_path(proj.origin, proj.target, range, flags);
        for &c in &path.grids {
            // balls explode before reaching walls
            if flags.contains(ProjectFlags::BOOM) && !world.grid.is_floor(c) {
                break;
            }
            centre = c;
            if flags.contains(ProjectFlags::BEAM) {
                grids.push(Affected { c, dist: 0 });
            }
        }
        if !flags.intersects(ProjectFlags::BEAM | ProjectFlags::BOOM) && centre != proj.origin {
            grids.push(Affected { c: centre, dist: 0 });
        }
    }

    if !flags.contains(ProjectFlags::BOOM) {
        return grids;
    }

    if proj.typ == DamageType::Acid {
        proj.flags |= ProjectFlags::WALL;
    }
    let flags = proj.flags;

    if grids.is_empty() {
        grids.push(Affected { c: centre, dist: 0 });
    }

    let rad = proj.rad;
    let star = if flags.contains(ProjectFlags::STAR) {
        Some(star_reach(world, centre, rad))
    } else {
        None
    };
    let centreline = angle_to(proj.target.y - centre.y, proj.target.x - centre.x);

    for y in centre.y - rad..=centre.y + rad {
        for x in centre.x - rad..=centre.x + rad {
            let c = Coord::new(y, x);
            if c == centre || !world.grid.in_bounds(c) {
                continue;
            }
            if !world.grid.is_floor(c) {
                let reached = flags.contains(ProjectFlags::PASS)
                    || (flags.contains(ProjectFlags::WALL)
                        && c.neighbours()
                            .any(|n| world.grid.is_floor(n) && world.grid.los(centre, n)));
                if !reached {
                    continue;
                }
            }
            let dist = distance(centre, c);
            if dist > rad {
                continue;
            }

            let included = if flags.contains(ProjectFlags::ARC) {
                let off = angle_diff(angle_to(y - centre.y, x - centre.x), centreline);
                2 * off < proj.degrees + 6 && world.grid.los(centre, c)
            } else if let Some(reach) = &star {
                reach.contains(&c)
            } else {
                flags.contains(ProjectFlags::PASS) || world.grid.los(centre, c)
            };
            if included {
                grids.push(Affected { c, dist });
            }
        }
    }

    grids.sort_by_key(|g| g.dist);
    grids
}

/// Grids a starburst reaches: a flood along the floor from the centre,
/// with a ragged edge that differs in each of the eight compass sectors.
/// Walls touching the flood are caught but do not pass it on.
fn star_reach(world: &mut World, centre: Coord, rad: i32) -> HashSet<Coord> {
    let mut sector_rad = [0; 8];
    for r in &mut sector_rad {
        *r = world.rng.rand_range((rad * 2 / 3).max(1), rad.max(1));
    }
    let sector = |c: Coord| -> usize {
        let a = angle_to(c.y - centre.y, c.x - centre.x);
        ((a + 22) % 360 / 45) as usize
    };

    let mut reached = HashSet::new();
    reached.insert(centre);
    let mut frontier = vec![centre];
    while let Some(cur) = frontier.pop() {
        for n in cur.neighbours() {
            if reached.contains(&n) || !world.grid.in_bounds(n) {
                continue;
            }
            if distance(centre, n) > sector_rad[sector(n)] {
                continue;
            }
            reached.insert(n);
            if world.grid.is_floor(n) {
                frontier.push(n);
            }
        }
    }
    reached
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::Actor;
    use crate::world::testing::arena;

    #[test]
    fn test_angles_of_the_compass() {
        assert_eq!(angle_to(0, 5), 0);
        assert_eq!(angle_to(-5, 0), 90);
        assert_eq!(angle_to(0, -5), 180);
        assert_eq!(angle_to(5, 0), 270);
        assert_eq!(angle_to(-3, 3), 45);
        assert_eq!(angle_to(3, -3), 225);
        assert_eq!(angle_to(-1, 2), 27);
    }

    #[test]
    fn test_angle_difference_wraps() {
        assert_eq!(angle_diff(350, 10), 20);
        assert_eq!(angle_diff(10, 350), 20);
        assert_eq!(angle_diff(90, 270), 180);
    }

    #[test]
    fn test_bolt_affects_only_its_end() {
        let mut world = arena();
        let mut proj = Projection::new(Actor::Player, world.player.pos, Coord::new(2, 7), DamageType::Fire);
        let grids = affected_grids(&mut world, &mut proj);
        assert_eq!(grids, vec![Affected { c: Coord::new(2, 7), dist: 0 }]);
    }

    #[test]
    fn test_ball_is_sorted_by_distance() {
        let mut world = arena();
        let mut proj = Projection::new(Actor::Player, world.player.pos, Coord::new(2, 6), DamageType::Fire)
            .radius(1)
            .flags(ProjectFlags::BOOM);
        let grids = affected_grids(&mut world, &mut proj);
        assert_eq!(grids[0].c, Coord::new(2, 6));
        assert_eq!(grids.len(), 9);
        assert!(grids.windows(2).all(|w| w[0].dist <= w[1].dist));
    }

    #[test]
    fn test_arc_faces_its_target() {
        let mut world = arena();
        let origin = world.player.pos;
        let mut proj = Projection::new(Actor::Player, origin, origin.offset(0, 3), DamageType::Fire)
            .radius(3)
            .arc(30);
        let grids = affected_grids(&mut world, &mut proj);
        assert!(grids.iter().any(|g| g.c == origin.offset(0, 3)));
        assert!(grids.iter().all(|g| g.c == origin || g.c.x > origin.x));
        assert!(!grids.iter().any(|g| g.c == origin.offset(-1, 2)));
    }

    #[test]
    fn test_starburst_stays_within_radius() {
        let mut world = arena();
        let origin = world.player.pos;
        let mut proj = Projection::new(Actor::Player, origin, origin.offset(0, 1), DamageType::Light)
            .radius(2)
            .flags(ProjectFlags::STAR | ProjectFlags::BOOM);
        let grids = affected_grids(&mut world, &mut proj);
        assert!(grids.iter().all(|g| g.dist <= 2));
        assert!(grids.iter().any(|g| g.c.is_adjacent(origin)));
    }
}
